//! Type and method signatures.
//!
//! Signatures are plain values: cloning one is cheap and copies only the [`Arc`] handles of
//! the types they mention. The injection engine rebuilds them element by element, swapping
//! every [`TypeDefOrRef`] for its destination counterpart.
//!
//! [`Arc`]: std::sync::Arc

use std::fmt;

use strum::{Display, EnumIter};

use crate::metadata::references::TypeDefOrRef;

/// Primitive element types (ECMA-335 §II.23.1.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum ElementType {
    /// `void`
    #[strum(serialize = "void")]
    Void,
    /// `bool`
    #[strum(serialize = "bool")]
    Boolean,
    /// `char`
    #[strum(serialize = "char")]
    Char,
    /// `int8`
    #[strum(serialize = "int8")]
    I1,
    /// `uint8`
    #[strum(serialize = "uint8")]
    U1,
    /// `int16`
    #[strum(serialize = "int16")]
    I2,
    /// `uint16`
    #[strum(serialize = "uint16")]
    U2,
    /// `int32`
    #[strum(serialize = "int32")]
    I4,
    /// `uint32`
    #[strum(serialize = "uint32")]
    U4,
    /// `int64`
    #[strum(serialize = "int64")]
    I8,
    /// `uint64`
    #[strum(serialize = "uint64")]
    U8,
    /// `float32`
    #[strum(serialize = "float32")]
    R4,
    /// `float64`
    #[strum(serialize = "float64")]
    R8,
    /// `string`
    #[strum(serialize = "string")]
    String,
    /// `object`
    #[strum(serialize = "object")]
    Object,
    /// `native int`
    #[strum(serialize = "native int")]
    I,
    /// `native uint`
    #[strum(serialize = "native uint")]
    U,
    /// `typedref`
    #[strum(serialize = "typedref")]
    TypedByRef,
}

/// A type signature.
#[derive(Clone, Debug)]
pub enum TypeSig {
    /// Built-in primitive.
    Primitive(ElementType),
    /// Reference type.
    Class(TypeDefOrRef),
    /// Value type.
    ValueType(TypeDefOrRef),
    /// Instantiated generic type.
    GenericInst {
        /// The open generic type.
        generic: TypeDefOrRef,
        /// Whether the generic type is a value type.
        is_value_type: bool,
        /// Generic arguments.
        args: Vec<TypeSig>,
    },
    /// Single-dimensional zero-based array.
    SzArray(Box<TypeSig>),
    /// General array.
    Array {
        /// Element type.
        element: Box<TypeSig>,
        /// Number of dimensions.
        rank: u32,
        /// Declared sizes.
        sizes: Vec<u32>,
        /// Declared lower bounds.
        lower_bounds: Vec<i32>,
    },
    /// Unmanaged pointer.
    Ptr(Box<TypeSig>),
    /// Managed reference.
    ByRef(Box<TypeSig>),
    /// Pinned local.
    Pinned(Box<TypeSig>),
    /// Generic type parameter by index.
    Var(u32),
    /// Generic method parameter by index.
    MVar(u32),
    /// Function pointer.
    FnPtr(Box<MethodSig>),
    /// Required custom modifier.
    ModReqd {
        /// Modifier type.
        modifier: TypeDefOrRef,
        /// Modified type.
        inner: Box<TypeSig>,
    },
    /// Optional custom modifier.
    ModOpt {
        /// Modifier type.
        modifier: TypeDefOrRef,
        /// Modified type.
        inner: Box<TypeSig>,
    },
}

impl TypeSig {
    /// `void`, the return type of most methods.
    pub const VOID: TypeSig = TypeSig::Primitive(ElementType::Void);

    /// Shorthand for a class signature.
    #[must_use]
    pub fn class(ty: TypeDefOrRef) -> Self {
        TypeSig::Class(ty)
    }

    /// Shorthand for a value type signature.
    #[must_use]
    pub fn value_type(ty: TypeDefOrRef) -> Self {
        TypeSig::ValueType(ty)
    }

    /// Shorthand for a `T[]` signature.
    #[must_use]
    pub fn sz_array(element: TypeSig) -> Self {
        TypeSig::SzArray(Box::new(element))
    }

    /// Calls `visit` for every [`TypeDefOrRef`] mentioned anywhere in this signature.
    pub fn for_each_type(&self, visit: &mut impl FnMut(&TypeDefOrRef)) {
        match self {
            TypeSig::Primitive(_) | TypeSig::Var(_) | TypeSig::MVar(_) => {}
            TypeSig::Class(ty) | TypeSig::ValueType(ty) => visit(ty),
            TypeSig::GenericInst { generic, args, .. } => {
                visit(generic);
                for arg in args {
                    arg.for_each_type(visit);
                }
            }
            TypeSig::SzArray(inner)
            | TypeSig::Ptr(inner)
            | TypeSig::ByRef(inner)
            | TypeSig::Pinned(inner) => inner.for_each_type(visit),
            TypeSig::Array { element, .. } => element.for_each_type(visit),
            TypeSig::FnPtr(method) => method.for_each_type(visit),
            TypeSig::ModReqd { modifier, inner } | TypeSig::ModOpt { modifier, inner } => {
                visit(modifier);
                inner.for_each_type(visit);
            }
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Primitive(element) => write!(f, "{}", element),
            TypeSig::Class(ty) | TypeSig::ValueType(ty) => f.write_str(&ty.full_name()),
            TypeSig::GenericInst { generic, args, .. } => {
                write!(f, "{}<", generic.full_name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
            TypeSig::SzArray(inner) => write!(f, "{}[]", inner),
            TypeSig::Array { element, rank, .. } => {
                let commas = ",".repeat(rank.saturating_sub(1) as usize);
                write!(f, "{}[{}]", element, commas)
            }
            TypeSig::Ptr(inner) => write!(f, "{}*", inner),
            TypeSig::ByRef(inner) => write!(f, "{}&", inner),
            TypeSig::Pinned(inner) => write!(f, "{} pinned", inner),
            TypeSig::Var(index) => write!(f, "!{}", index),
            TypeSig::MVar(index) => write!(f, "!!{}", index),
            TypeSig::FnPtr(method) => write!(f, "method {}", method),
            TypeSig::ModReqd { modifier, inner } => {
                write!(f, "{} modreq({})", inner, modifier.full_name())
            }
            TypeSig::ModOpt { modifier, inner } => {
                write!(f, "{} modopt({})", inner, modifier.full_name())
            }
        }
    }
}

/// A method signature (ECMA-335 §II.23.2.1).
#[derive(Clone, Debug)]
pub struct MethodSig {
    /// Instance method, an implicit `this` precedes the parameters.
    pub has_this: bool,
    /// `this` is passed explicitly as the first parameter.
    pub explicit_this: bool,
    /// Number of generic method parameters.
    pub generic_param_count: u32,
    /// Return type.
    pub return_type: TypeSig,
    /// Declared parameter types, excluding `this`.
    pub params: Vec<TypeSig>,
}

impl MethodSig {
    /// A static method signature.
    #[must_use]
    pub fn new_static(return_type: TypeSig, params: Vec<TypeSig>) -> Self {
        MethodSig {
            has_this: false,
            explicit_this: false,
            generic_param_count: 0,
            return_type,
            params,
        }
    }

    /// An instance method signature.
    #[must_use]
    pub fn new_instance(return_type: TypeSig, params: Vec<TypeSig>) -> Self {
        MethodSig {
            has_this: true,
            ..Self::new_static(return_type, params)
        }
    }

    /// Number of argument slots, counting an implicit `this`.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        self.params.len() + usize::from(self.has_this && !self.explicit_this)
    }

    /// Calls `visit` for every [`TypeDefOrRef`] mentioned in the return type or parameters.
    pub fn for_each_type(&self, visit: &mut impl FnMut(&TypeDefOrRef)) {
        self.return_type.for_each_type(visit);
        for param in &self.params {
            param.for_each_type(visit);
        }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_this {
            f.write_str("instance ")?;
        }
        write!(f, "{}(", self.return_type)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        identity::AssemblyIdentity,
        references::{AssemblyRef, ResolutionScope, TypeRef},
    };

    fn list_of_string() -> TypeSig {
        let corlib = AssemblyRef::new(AssemblyIdentity::named("mscorlib"));
        let list = TypeRef::new(
            "System.Collections.Generic",
            "List`1",
            ResolutionScope::Assembly(corlib),
        );
        TypeSig::GenericInst {
            generic: TypeDefOrRef::TypeRef(list),
            is_value_type: false,
            args: vec![TypeSig::Primitive(ElementType::String)],
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            list_of_string().to_string(),
            "System.Collections.Generic.List`1<string>"
        );
        assert_eq!(
            TypeSig::sz_array(TypeSig::Primitive(ElementType::I4)).to_string(),
            "int32[]"
        );
        assert_eq!(TypeSig::MVar(0).to_string(), "!!0");
    }

    #[test]
    fn test_for_each_type_visits_nested_positions() {
        let sig = MethodSig::new_static(
            TypeSig::ByRef(Box::new(list_of_string())),
            vec![TypeSig::sz_array(list_of_string()), TypeSig::Var(0)],
        );

        let mut names = Vec::new();
        sig.for_each_type(&mut |ty| names.push(ty.full_name()));
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n == "System.Collections.Generic.List`1"));
    }

    #[test]
    fn test_argument_count() {
        let static_sig = MethodSig::new_static(TypeSig::VOID, vec![TypeSig::Var(0)]);
        let instance_sig = MethodSig::new_instance(TypeSig::VOID, vec![TypeSig::Var(0)]);
        assert_eq!(static_sig.argument_count(), 1);
        assert_eq!(instance_sig.argument_count(), 2);
    }
}
