//! Structural comparison of types and signatures.
//!
//! References cross module boundaries, so two [`TypeRef`]s that name the same type are
//! usually distinct objects. [`SigComparer`] compares them by shape instead: names,
//! nesting chain and, unless [`SigComparerOptions::DONT_COMPARE_TYPE_SCOPE`] is set, the
//! identity of the assembly at the end of the scope chain.

use std::sync::Arc;

use bitflags::bitflags;

use crate::metadata::{
    identity::AssemblyIdentity,
    references::{AssemblyRefRc, ExportedType, ResolutionScope, TypeDefOrRef, TypeRef},
    signatures::{MethodSig, TypeSig},
    typedef::TypeDef,
};

bitflags! {
    /// Knobs for [`SigComparer`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SigComparerOptions: u32 {
        /// Compare names and nesting only, never the defining assembly.
        const DONT_COMPARE_TYPE_SCOPE = 0x0001;
    }
}

/// Structural equality over types and signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigComparer {
    options: SigComparerOptions,
}

impl SigComparer {
    /// Creates a comparer with the given options.
    #[must_use]
    pub const fn new(options: SigComparerOptions) -> Self {
        SigComparer { options }
    }

    fn compares_scope(&self) -> bool {
        !self
            .options
            .contains(SigComparerOptions::DONT_COMPARE_TYPE_SCOPE)
    }

    fn scopes_equal(&self, a: Option<&AssemblyIdentity>, b: Option<&AssemblyIdentity>) -> bool {
        if !self.compares_scope() {
            return true;
        }
        match (a, b) {
            (Some(a), Some(b)) => a.matches_exactly(b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Two type references name the same type.
    #[must_use]
    pub fn type_refs_equal(&self, a: &TypeRef, b: &TypeRef) -> bool {
        if a.name != b.name || a.namespace != b.namespace {
            return false;
        }

        match (&a.scope, &b.scope) {
            (ResolutionScope::Type(outer_a), ResolutionScope::Type(outer_b)) => {
                self.type_refs_equal(outer_a, outer_b)
            }
            (ResolutionScope::Type(_), _) | (_, ResolutionScope::Type(_)) => false,
            (ResolutionScope::Module(module_a), ResolutionScope::Module(module_b)) => {
                !self.compares_scope() || module_a.name.eq_ignore_ascii_case(&module_b.name)
            }
            _ => self.scopes_equal(
                identity_of(a.definition_assembly().as_ref()),
                identity_of(b.definition_assembly().as_ref()),
            ),
        }
    }

    /// A forwarding entry names the same type as a reference.
    #[must_use]
    pub fn exported_type_equals(&self, exported: &ExportedType, reference: &TypeRef) -> bool {
        if exported.name != reference.name || exported.namespace != reference.namespace {
            return false;
        }

        match (exported.declaring_type(), reference.declaring_type()) {
            (Some(outer_exported), Some(outer_reference)) => {
                self.exported_type_equals(outer_exported, outer_reference)
            }
            (None, None) => self.scopes_equal(
                identity_of(exported.implementation_assembly().as_ref()),
                identity_of(reference.definition_assembly().as_ref()),
            ),
            _ => false,
        }
    }

    /// A definition is the type a reference names.
    #[must_use]
    pub fn type_def_matches(&self, definition: &TypeDef, reference: &TypeRef) -> bool {
        if definition.name != reference.name {
            return false;
        }

        match (definition.declaring_type(), reference.declaring_type()) {
            (Some(outer_definition), Some(outer_reference)) => {
                self.type_def_matches(&outer_definition, outer_reference)
            }
            (None, None) => {
                if definition.namespace != reference.namespace {
                    return false;
                }
                let owner = definition
                    .module()
                    .and_then(|module| module.assembly_identity());
                self.scopes_equal(
                    owner.as_ref(),
                    identity_of(reference.definition_assembly().as_ref()),
                )
            }
            _ => false,
        }
    }

    /// Two type operands name the same type.
    #[must_use]
    pub fn types_equal(&self, a: &TypeDefOrRef, b: &TypeDefOrRef) -> bool {
        match (a, b) {
            (TypeDefOrRef::TypeDef(a), TypeDefOrRef::TypeDef(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.full_name() == b.full_name()
                        && self.scopes_equal(
                            a.module().and_then(|m| m.assembly_identity()).as_ref(),
                            b.module().and_then(|m| m.assembly_identity()).as_ref(),
                        ))
            }
            (TypeDefOrRef::TypeDef(def), TypeDefOrRef::TypeRef(reference))
            | (TypeDefOrRef::TypeRef(reference), TypeDefOrRef::TypeDef(def)) => {
                self.type_def_matches(def, reference)
            }
            (TypeDefOrRef::TypeRef(a), TypeDefOrRef::TypeRef(b)) => self.type_refs_equal(a, b),
            (TypeDefOrRef::TypeSpec(a), TypeDefOrRef::TypeSpec(b)) => {
                self.sigs_equal(&a.signature, &b.signature)
            }
            _ => false,
        }
    }

    /// Two type signatures are structurally equal.
    #[must_use]
    pub fn sigs_equal(&self, a: &TypeSig, b: &TypeSig) -> bool {
        match (a, b) {
            (TypeSig::Primitive(a), TypeSig::Primitive(b)) => a == b,
            (TypeSig::Class(a), TypeSig::Class(b))
            | (TypeSig::ValueType(a), TypeSig::ValueType(b)) => self.types_equal(a, b),
            (
                TypeSig::GenericInst {
                    generic: generic_a,
                    is_value_type: value_a,
                    args: args_a,
                },
                TypeSig::GenericInst {
                    generic: generic_b,
                    is_value_type: value_b,
                    args: args_b,
                },
            ) => {
                value_a == value_b
                    && self.types_equal(generic_a, generic_b)
                    && self.all_equal(args_a, args_b)
            }
            (TypeSig::SzArray(a), TypeSig::SzArray(b))
            | (TypeSig::Ptr(a), TypeSig::Ptr(b))
            | (TypeSig::ByRef(a), TypeSig::ByRef(b))
            | (TypeSig::Pinned(a), TypeSig::Pinned(b)) => self.sigs_equal(a, b),
            (
                TypeSig::Array {
                    element: element_a,
                    rank: rank_a,
                    sizes: sizes_a,
                    lower_bounds: bounds_a,
                },
                TypeSig::Array {
                    element: element_b,
                    rank: rank_b,
                    sizes: sizes_b,
                    lower_bounds: bounds_b,
                },
            ) => {
                rank_a == rank_b
                    && sizes_a == sizes_b
                    && bounds_a == bounds_b
                    && self.sigs_equal(element_a, element_b)
            }
            (TypeSig::Var(a), TypeSig::Var(b)) | (TypeSig::MVar(a), TypeSig::MVar(b)) => a == b,
            (TypeSig::FnPtr(a), TypeSig::FnPtr(b)) => self.method_sigs_equal(a, b),
            (
                TypeSig::ModReqd {
                    modifier: modifier_a,
                    inner: inner_a,
                },
                TypeSig::ModReqd {
                    modifier: modifier_b,
                    inner: inner_b,
                },
            )
            | (
                TypeSig::ModOpt {
                    modifier: modifier_a,
                    inner: inner_a,
                },
                TypeSig::ModOpt {
                    modifier: modifier_b,
                    inner: inner_b,
                },
            ) => self.types_equal(modifier_a, modifier_b) && self.sigs_equal(inner_a, inner_b),
            _ => false,
        }
    }

    /// Two method signatures are structurally equal.
    #[must_use]
    pub fn method_sigs_equal(&self, a: &MethodSig, b: &MethodSig) -> bool {
        a.has_this == b.has_this
            && a.explicit_this == b.explicit_this
            && a.generic_param_count == b.generic_param_count
            && self.sigs_equal(&a.return_type, &b.return_type)
            && self.all_equal(&a.params, &b.params)
    }

    fn all_equal(&self, a: &[TypeSig], b: &[TypeSig]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| self.sigs_equal(a, b))
    }
}

fn identity_of(assembly: Option<&AssemblyRefRc>) -> Option<&AssemblyIdentity> {
    assembly.map(|assembly| &assembly.identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        references::{AssemblyRef, ExportedImplementation},
        signatures::ElementType,
    };

    fn type_ref(assembly: &str, namespace: &str, name: &str) -> Arc<TypeRef> {
        let scope = AssemblyRef::new(AssemblyIdentity::named(assembly));
        TypeRef::new(namespace, name, ResolutionScope::Assembly(scope))
    }

    #[test]
    fn test_scope_is_compared_by_default() {
        let strict = SigComparer::default();
        let loose = SigComparer::new(SigComparerOptions::DONT_COMPARE_TYPE_SCOPE);
        let a = type_ref("mscorlib", "System", "Object");
        let b = type_ref("System.Runtime", "System", "Object");
        let c = type_ref("MSCORLIB", "System", "Object");

        assert!(!strict.type_refs_equal(&a, &b));
        assert!(strict.type_refs_equal(&a, &c));
        assert!(loose.type_refs_equal(&a, &b));
        assert!(!loose.type_refs_equal(&a, &type_ref("mscorlib", "System", "String")));
    }

    #[test]
    fn test_exported_type_nested_chain() {
        let loose = SigComparer::new(SigComparerOptions::DONT_COMPARE_TYPE_SCOPE);
        let target = AssemblyRef::new(AssemblyIdentity::named("System.Runtime"));
        let outer = ExportedType::new("System", "Environment", ExportedImplementation::Assembly(target));
        let inner = ExportedType::new("", "SpecialFolder", ExportedImplementation::Type(outer.clone()));

        let outer_ref = type_ref("netstandard", "System", "Environment");
        let inner_ref = TypeRef::new("", "SpecialFolder", ResolutionScope::Type(outer_ref.clone()));

        assert!(loose.exported_type_equals(&outer, &outer_ref));
        assert!(loose.exported_type_equals(&inner, &inner_ref));
        assert!(!loose.exported_type_equals(&outer, &inner_ref));
        assert!(!SigComparer::default().exported_type_equals(&outer, &outer_ref));
    }

    #[test]
    fn test_sigs_equal_through_generic_instances() {
        let comparer = SigComparer::default();
        let list = |assembly| TypeSig::GenericInst {
            generic: TypeDefOrRef::TypeRef(type_ref(assembly, "System.Collections.Generic", "List`1")),
            is_value_type: false,
            args: vec![TypeSig::Primitive(ElementType::I4)],
        };

        assert!(comparer.sigs_equal(&list("mscorlib"), &list("mscorlib")));
        assert!(!comparer.sigs_equal(&list("mscorlib"), &list("netstandard")));
        assert!(comparer.method_sigs_equal(
            &MethodSig::new_static(TypeSig::VOID, vec![list("mscorlib")]),
            &MethodSig::new_static(TypeSig::VOID, vec![list("mscorlib")]),
        ));
        assert!(!comparer.method_sigs_equal(
            &MethodSig::new_static(TypeSig::VOID, vec![]),
            &MethodSig::new_instance(TypeSig::VOID, vec![]),
        ));
    }
}
