//! Reference-side metadata: rows that name things living elsewhere.
//!
//! Definitions ([`crate::metadata::typedef::TypeDef`], [`crate::metadata::method::MethodDef`],
//! [`crate::metadata::field::FieldDef`]) are owned by the module that declares them. Every
//! other module can only point at them through the reference rows in this file:
//!
//! - [`AssemblyRef`] and [`ModuleRef`] name a foreign assembly or native module
//! - [`TypeRef`] names a type through a [`ResolutionScope`] chain that ends in an assembly
//!   or module reference; nested types chain through their declaring [`TypeRef`]
//! - [`ExportedType`] is a type an assembly declares to live somewhere else (a forwarder)
//! - [`MemberRef`] and [`MethodSpec`] name members and generic method instantiations
//!
//! Operands and signatures that may point at either side use the closed sum types
//! [`TypeDefOrRef`], [`MethodTarget`] and [`FieldTarget`].

use std::{fmt, sync::Arc};

use crate::metadata::{
    assembly::AssemblyFlags,
    field::FieldDefRc,
    identity::AssemblyIdentity,
    method::MethodDefRc,
    signatures::{MethodSig, TypeSig},
    typedef::TypeDefRc,
};

/// A reference to an [`AssemblyRef`]
pub type AssemblyRefRc = Arc<AssemblyRef>;
/// A reference to a [`ModuleRef`]
pub type ModuleRefRc = Arc<ModuleRef>;
/// A reference to a [`TypeRef`]
pub type TypeRefRc = Arc<TypeRef>;
/// A reference to a [`TypeSpec`]
pub type TypeSpecRc = Arc<TypeSpec>;
/// A reference to an [`ExportedType`]
pub type ExportedTypeRc = Arc<ExportedType>;
/// A reference to a [`MemberRef`]
pub type MemberRefRc = Arc<MemberRef>;
/// A reference to a [`MethodSpec`]
pub type MethodSpecRc = Arc<MethodSpec>;

/// Reference to a foreign assembly (`AssemblyRef` table, ECMA-335 §II.22.5).
#[derive(Debug)]
pub struct AssemblyRef {
    /// Identity of the referenced assembly.
    pub identity: AssemblyIdentity,
    /// Reference flags, only `PUBLIC_KEY` and `RETARGETABLE` are meaningful here.
    pub flags: AssemblyFlags,
}

impl AssemblyRef {
    /// Creates a new reference to the assembly described by `identity`.
    #[must_use]
    pub fn new(identity: AssemblyIdentity) -> AssemblyRefRc {
        let flags = if identity.is_strong_named() {
            AssemblyFlags::PUBLIC_KEY
        } else {
            AssemblyFlags::empty()
        };
        Arc::new(AssemblyRef { identity, flags })
    }

    /// Simple name of the referenced assembly.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }
}

/// Reference to a native or secondary module (`ModuleRef` table).
#[derive(Debug)]
pub struct ModuleRef {
    /// File name of the module, e.g. `kernel32.dll`.
    pub name: String,
}

impl ModuleRef {
    /// Creates a new module reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> ModuleRefRc {
        Arc::new(ModuleRef { name: name.into() })
    }
}

/// Where a [`TypeRef`] is to be looked up.
#[derive(Clone)]
pub enum ResolutionScope {
    /// Top-level type defined in another assembly.
    Assembly(AssemblyRefRc),
    /// Top-level type defined in another module of the same assembly.
    Module(ModuleRefRc),
    /// Nested type, scoped to its declaring type.
    Type(TypeRefRc),
}

/// Reference to a type defined elsewhere (`TypeRef` table, ECMA-335 §II.22.38).
pub struct TypeRef {
    /// Namespace, empty for nested types and the global namespace.
    pub namespace: String,
    /// Simple name, including a generic arity suffix such as `` List`1 ``.
    pub name: String,
    /// Resolution scope.
    pub scope: ResolutionScope,
}

impl TypeRef {
    /// Creates a new type reference.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        scope: ResolutionScope,
    ) -> TypeRefRc {
        Arc::new(TypeRef {
            namespace: namespace.into(),
            name: name.into(),
            scope,
        })
    }

    /// The declaring type reference of a nested type.
    #[must_use]
    pub fn declaring_type(&self) -> Option<&TypeRefRc> {
        match &self.scope {
            ResolutionScope::Type(outer) => Some(outer),
            _ => None,
        }
    }

    /// Returns true if this reference names a nested type.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        matches!(self.scope, ResolutionScope::Type(_))
    }

    /// The assembly the referenced type is defined in, walking through declaring types.
    ///
    /// Returns `None` when the chain ends in a [`ModuleRef`].
    #[must_use]
    pub fn definition_assembly(&self) -> Option<AssemblyRefRc> {
        match &self.scope {
            ResolutionScope::Assembly(assembly) => Some(assembly.clone()),
            ResolutionScope::Module(_) => None,
            ResolutionScope::Type(outer) => outer.definition_assembly(),
        }
    }

    /// Full name in `Namespace.Outer/Inner` form.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.declaring_type() {
            Some(outer) => format!("{}/{}", outer.full_name(), self.name),
            None => qualified(&self.namespace, &self.name),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({})", self.full_name())
    }
}

/// A constructed type (`TypeSpec` table): arrays, generic instances, pointers.
pub struct TypeSpec {
    /// The type signature this spec stands for.
    pub signature: TypeSig,
}

impl TypeSpec {
    /// Wraps a signature into a type spec.
    #[must_use]
    pub fn new(signature: TypeSig) -> TypeSpecRc {
        Arc::new(TypeSpec { signature })
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeSpec({})", self.signature)
    }
}

/// A type named by definition, by reference or by constructed signature.
#[derive(Clone)]
pub enum TypeDefOrRef {
    /// A type defined in the module that holds this value.
    TypeDef(TypeDefRc),
    /// A type defined elsewhere.
    TypeRef(TypeRefRc),
    /// A constructed type.
    TypeSpec(TypeSpecRc),
}

impl TypeDefOrRef {
    /// Namespace of the named type, empty for type specs.
    #[must_use]
    pub fn namespace(&self) -> &str {
        match self {
            TypeDefOrRef::TypeDef(def) => &def.namespace,
            TypeDefOrRef::TypeRef(reference) => &reference.namespace,
            TypeDefOrRef::TypeSpec(_) => "",
        }
    }

    /// Simple name of the named type, empty for type specs.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TypeDefOrRef::TypeDef(def) => &def.name,
            TypeDefOrRef::TypeRef(reference) => &reference.name,
            TypeDefOrRef::TypeSpec(_) => "",
        }
    }

    /// Full name in `Namespace.Outer/Inner` form.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self {
            TypeDefOrRef::TypeDef(def) => def.full_name(),
            TypeDefOrRef::TypeRef(reference) => reference.full_name(),
            TypeDefOrRef::TypeSpec(spec) => spec.signature.to_string(),
        }
    }

    /// The definition, if this names one.
    #[must_use]
    pub fn as_type_def(&self) -> Option<&TypeDefRc> {
        match self {
            TypeDefOrRef::TypeDef(def) => Some(def),
            _ => None,
        }
    }

    /// The reference, if this names one.
    #[must_use]
    pub fn as_type_ref(&self) -> Option<&TypeRefRc> {
        match self {
            TypeDefOrRef::TypeRef(reference) => Some(reference),
            _ => None,
        }
    }

    /// Identity comparison: both sides point at the very same object.
    #[must_use]
    pub fn is_same(&self, other: &TypeDefOrRef) -> bool {
        match (self, other) {
            (TypeDefOrRef::TypeDef(a), TypeDefOrRef::TypeDef(b)) => Arc::ptr_eq(a, b),
            (TypeDefOrRef::TypeRef(a), TypeDefOrRef::TypeRef(b)) => Arc::ptr_eq(a, b),
            (TypeDefOrRef::TypeSpec(a), TypeDefOrRef::TypeSpec(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for TypeDefOrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDefOrRef::TypeDef(def) => write!(f, "TypeDef({})", def.full_name()),
            TypeDefOrRef::TypeRef(reference) => write!(f, "TypeRef({})", reference.full_name()),
            TypeDefOrRef::TypeSpec(spec) => write!(f, "TypeSpec({})", spec.signature),
        }
    }
}

/// Where an [`ExportedType`] actually lives.
#[derive(Clone)]
pub enum ExportedImplementation {
    /// Forwarded to another assembly.
    Assembly(AssemblyRefRc),
    /// Nested in another exported type.
    Type(ExportedTypeRc),
    /// Defined in another file of the same assembly.
    File(String),
}

/// A type declared by an assembly but defined elsewhere (`ExportedType` table).
pub struct ExportedType {
    /// Namespace of the exported type.
    pub namespace: String,
    /// Simple name of the exported type.
    pub name: String,
    /// Raw `TypeAttributes` of the row.
    pub flags: u32,
    /// Implementation the export points at.
    pub implementation: ExportedImplementation,
}

impl ExportedType {
    /// Creates a new exported type.
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        implementation: ExportedImplementation,
    ) -> ExportedTypeRc {
        Arc::new(ExportedType {
            namespace: namespace.into(),
            name: name.into(),
            flags: 0,
            implementation,
        })
    }

    /// The enclosing export of a nested exported type.
    #[must_use]
    pub fn declaring_type(&self) -> Option<&ExportedTypeRc> {
        match &self.implementation {
            ExportedImplementation::Type(outer) => Some(outer),
            _ => None,
        }
    }

    /// The assembly the export finally forwards to, walking through enclosing exports.
    #[must_use]
    pub fn implementation_assembly(&self) -> Option<AssemblyRefRc> {
        match &self.implementation {
            ExportedImplementation::Assembly(assembly) => Some(assembly.clone()),
            ExportedImplementation::Type(outer) => outer.implementation_assembly(),
            ExportedImplementation::File(_) => None,
        }
    }

    /// Full name in `Namespace.Outer/Inner` form.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.declaring_type() {
            Some(outer) => format!("{}/{}", outer.full_name(), self.name),
            None => qualified(&self.namespace, &self.name),
        }
    }

    /// Converts the export into a type reference scoped at its implementation.
    ///
    /// Nested exports produce a nested reference chain; file implementations are scoped
    /// through a [`ModuleRef`] of the same name.
    #[must_use]
    pub fn to_type_ref(&self) -> TypeRefRc {
        let scope = match &self.implementation {
            ExportedImplementation::Assembly(assembly) => ResolutionScope::Assembly(assembly.clone()),
            ExportedImplementation::Type(outer) => ResolutionScope::Type(outer.to_type_ref()),
            ExportedImplementation::File(file) => ResolutionScope::Module(ModuleRef::new(file)),
        };
        TypeRef::new(self.namespace.clone(), self.name.clone(), scope)
    }
}

impl fmt::Debug for ExportedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExportedType({})", self.full_name())
    }
}

/// The type or module a [`MemberRef`] belongs to.
#[derive(Clone, Debug)]
pub enum MemberRefParent {
    /// Member of a type.
    Type(TypeDefOrRef),
    /// Global member of another module.
    Module(ModuleRefRc),
}

/// Signature of a [`MemberRef`].
#[derive(Clone, Debug)]
pub enum MemberSignature {
    /// Method reference.
    Method(MethodSig),
    /// Field reference.
    Field(TypeSig),
}

/// Reference to a method or field by parent, name and signature (`MemberRef` table).
#[derive(Debug)]
pub struct MemberRef {
    /// Member name.
    pub name: String,
    /// Declaring parent.
    pub parent: MemberRefParent,
    /// Member signature.
    pub signature: MemberSignature,
}

impl MemberRef {
    /// Creates a new member reference.
    pub fn new(
        name: impl Into<String>,
        parent: MemberRefParent,
        signature: MemberSignature,
    ) -> MemberRefRc {
        Arc::new(MemberRef {
            name: name.into(),
            parent,
            signature,
        })
    }

    /// Returns true if this references a method.
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(self.signature, MemberSignature::Method(_))
    }
}

/// Instantiation of a generic method (`MethodSpec` table).
#[derive(Debug)]
pub struct MethodSpec {
    /// The generic method being instantiated.
    pub method: MethodTarget,
    /// Generic arguments.
    pub instantiation: Vec<TypeSig>,
}

impl MethodSpec {
    /// Creates a new generic method instantiation.
    #[must_use]
    pub fn new(method: MethodTarget, instantiation: Vec<TypeSig>) -> MethodSpecRc {
        Arc::new(MethodSpec {
            method,
            instantiation,
        })
    }
}

/// A method named by definition, member reference or generic instantiation.
#[derive(Clone)]
pub enum MethodTarget {
    /// Method definition.
    Def(MethodDefRc),
    /// Member reference.
    Ref(MemberRefRc),
    /// Generic instantiation.
    Spec(MethodSpecRc),
}

impl MethodTarget {
    /// Name of the targeted method.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            MethodTarget::Def(def) => &def.name,
            MethodTarget::Ref(reference) => &reference.name,
            MethodTarget::Spec(spec) => spec.method.name(),
        }
    }

    /// The definition, if this targets one directly.
    #[must_use]
    pub fn as_def(&self) -> Option<&MethodDefRc> {
        match self {
            MethodTarget::Def(def) => Some(def),
            _ => None,
        }
    }

    /// The member reference, if this targets one directly.
    #[must_use]
    pub fn as_member_ref(&self) -> Option<&MemberRefRc> {
        match self {
            MethodTarget::Ref(reference) => Some(reference),
            _ => None,
        }
    }
}

impl fmt::Debug for MethodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodTarget::Def(def) => write!(f, "MethodDef({})", def.name),
            MethodTarget::Ref(reference) => write!(f, "MemberRef({})", reference.name),
            MethodTarget::Spec(spec) => write!(f, "MethodSpec({:?})", spec.method),
        }
    }
}

/// A field named by definition or member reference.
#[derive(Clone)]
pub enum FieldTarget {
    /// Field definition.
    Def(FieldDefRc),
    /// Member reference.
    Ref(MemberRefRc),
}

impl FieldTarget {
    /// Name of the targeted field.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            FieldTarget::Def(def) => &def.name,
            FieldTarget::Ref(reference) => &reference.name,
        }
    }
}

impl fmt::Debug for FieldTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldTarget::Def(def) => write!(f, "FieldDef({})", def.name),
            FieldTarget::Ref(reference) => write!(f, "MemberRef({})", reference.name),
        }
    }
}

pub(crate) fn qualified(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}
