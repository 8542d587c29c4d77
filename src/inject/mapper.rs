//! Re-anchoring references across base-library boundaries.
//!
//! A type reference copied out of a module built against one runtime usually names its
//! base library (`mscorlib`, `System.Runtime`, ...) as scope. When the destination was
//! built against a different base library that scope is wrong, so the mapper tries a
//! fixed sequence of candidate scopes and keeps the first one that actually knows the
//! type, either as a definition or as a type forwarder:
//!
//! 1. the destination's own base library
//! 2. `netstandard`, following forwarders
//! 3. `mscorlib`, following forwarders
//! 4. the assembly named by the source reference itself
//! 5. `System.Private.CoreLib`
//!
//! Forwarders are never followed into `System.Private.CoreLib`; a forward pointing there
//! keeps the facade as scope.

use std::sync::Arc;

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    inject::context::{InjectContext, StagedChanges},
    metadata::{
        comparer::{SigComparer, SigComparerOptions},
        field::FieldDefRc,
        identity::AssemblyIdentity,
        method::MethodDefRc,
        references::{AssemblyRefRc, ResolutionScope, TypeRef, TypeRefRc},
        reftable::ReferenceRow,
        typedef::TypeDefRc,
    },
    resolver::{MSCORLIB, NETSTANDARD, PRIVATE_CORELIB},
};

/// Candidate scope of the cross-runtime fallback chain, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum FallbackScope {
    /// The destination module's base library.
    #[strum(serialize = "target corlib")]
    TargetCorLib,
    /// The `netstandard` facade.
    #[strum(serialize = "netstandard")]
    Netstandard,
    /// The .NET Framework base library.
    #[strum(serialize = "mscorlib")]
    Mscorlib,
    /// The assembly the source reference names.
    #[strum(serialize = "definition assembly")]
    DefinitionAssembly,
    /// The .NET Core private base library.
    #[strum(serialize = "System.Private.CoreLib")]
    PrivateCoreLib,
}

impl FallbackScope {
    /// Returns true if a forwarder found in this scope is followed to its target.
    #[must_use]
    pub fn follows_forwarders(self) -> bool {
        matches!(self, FallbackScope::Netstandard | FallbackScope::Mscorlib)
    }
}

/// Outcome of asking a mapper about a reference.
#[derive(Debug, Clone)]
pub enum Mapping<T> {
    /// The mapper has no opinion; import the reference as usual.
    Unchanged,
    /// Use this destination reference instead.
    Mapped(T),
    /// The reference cannot be anchored in the destination.
    Unresolved,
}

/// Hook consulted by the [`Importer`](crate::inject::importer::Importer) before it builds
/// a destination reference.
pub trait ImportMapper {
    /// The clone of a source type, if one exists.
    fn map_type_def(&self, source: &TypeDefRc) -> Option<TypeDefRc>;

    /// The clone of a source method, if one exists.
    fn map_method(&self, source: &MethodDefRc) -> Option<MethodDefRc>;

    /// The clone of a source field, if one exists.
    fn map_field(&self, source: &FieldDefRc) -> Option<FieldDefRc>;

    /// A destination reference to use in place of `source`.
    fn map_type_ref(&mut self, source: &TypeRefRc) -> Mapping<TypeRefRc>;

    /// Where new destination rows are collected.
    fn staged(&mut self) -> &mut StagedChanges;
}

impl ImportMapper for InjectContext {
    fn map_type_def(&self, source: &TypeDefRc) -> Option<TypeDefRc> {
        self.map.type_of(source)
    }

    fn map_method(&self, source: &MethodDefRc) -> Option<MethodDefRc> {
        self.map.method_of(source)
    }

    fn map_field(&self, source: &FieldDefRc) -> Option<FieldDefRc> {
        self.map.field_of(source)
    }

    fn map_type_ref(&mut self, source: &TypeRefRc) -> Mapping<TypeRefRc> {
        if let Some(cached) = self.map.type_ref_of(source) {
            return cached.map_or(Mapping::Unresolved, Mapping::Mapped);
        }

        let Some(definition) = source.definition_assembly() else {
            return Mapping::Unchanged;
        };
        if self
            .target
            .assembly_identity()
            .is_some_and(|own| own.matches_exactly(&definition.identity))
        {
            return Mapping::Unchanged;
        }
        if !self.crosses_base_library() {
            return Mapping::Unchanged;
        }

        for scope in FallbackScope::iter() {
            let Some(anchor) = self.scope_for(scope, &definition.identity) else {
                log::trace!("{}: no {} scope available", source.full_name(), scope);
                continue;
            };
            log::trace!(
                "{}: trying {} ({})",
                source.full_name(),
                scope,
                anchor.identity.display_name()
            );

            if let Some(mapped) = self.try_resolve_type(source, &anchor, scope.follows_forwarders()) {
                log::trace!(
                    "{}: anchored at {}",
                    source.full_name(),
                    mapped
                        .definition_assembly()
                        .map_or_else(String::new, |assembly| assembly.identity.display_name())
                );
                let mapped = self.intern_chain(&mapped);
                self.map.insert_type_ref(source, Some(mapped.clone()));
                return Mapping::Mapped(mapped);
            }
        }

        log::trace!("{}: fallback chain exhausted", source.full_name());
        self.map.insert_type_ref(source, None);
        Mapping::Unresolved
    }

    fn staged(&mut self) -> &mut StagedChanges {
        &mut self.staged
    }
}

impl InjectContext {
    fn crosses_base_library(&self) -> bool {
        let origin = self.origin.as_ref().and_then(|origin| origin.corlib_ref());
        match (origin, self.target.corlib_ref()) {
            (Some(origin), Some(target)) => !origin.identity.matches_exactly(&target.identity),
            (None, None) => false,
            _ => true,
        }
    }

    fn scope_for(
        &mut self,
        scope: FallbackScope,
        definition: &AssemblyIdentity,
    ) -> Option<AssemblyRefRc> {
        match scope {
            FallbackScope::TargetCorLib => self.target.corlib_ref(),
            FallbackScope::Netstandard => self.assembly_ref_named(NETSTANDARD),
            FallbackScope::Mscorlib => self.assembly_ref_named(MSCORLIB),
            FallbackScope::DefinitionAssembly => self.assembly_ref_named(&definition.name),
            FallbackScope::PrivateCoreLib => self.assembly_ref_named(PRIVATE_CORELIB),
        }
    }

    /// A destination assembly reference for the simple name `name`: an existing one if the
    /// destination has it, otherwise one built from whatever the resolver finds.
    fn assembly_ref_named(&mut self, name: &str) -> Option<AssemblyRefRc> {
        let key = name.to_ascii_lowercase();
        if let Some(cached) = self.well_known.get(&key) {
            return cached.clone();
        }

        let found = self.target.get_assembly_ref(name).or_else(|| {
            self.resolver
                .resolve(&AssemblyIdentity::named(name), Some(self.target.as_ref()))
                .map(|assembly| {
                    self.staged
                        .find_assembly_ref(&self.target, &assembly.identity)
                        .unwrap_or_else(|| assembly.to_assembly_ref())
                })
        });

        self.well_known.insert(key, found.clone());
        found
    }

    fn try_resolve_type(
        &mut self,
        source: &TypeRef,
        scope: &AssemblyRefRc,
        follow_forwarders: bool,
    ) -> Option<TypeRefRc> {
        let candidate = reanchor(source, ResolutionScope::Assembly(scope.clone()));
        let resolved = self.resolver.resolve(&scope.identity, Some(self.target.as_ref()))?;

        if resolved.type_exists(&candidate) {
            return Some(candidate);
        }

        let comparer = SigComparer::new(SigComparerOptions::DONT_COMPARE_TYPE_SCOPE);
        let exported = resolved
            .exported_types()
            .into_iter()
            .find(|exported| comparer.exported_type_equals(exported, &candidate))?;

        let implementation = exported.implementation_assembly();
        let into_private_corlib = implementation.as_ref().is_some_and(|implementation| {
            implementation.name().eq_ignore_ascii_case(PRIVATE_CORELIB)
        });
        if !follow_forwarders || into_private_corlib {
            return Some(candidate);
        }

        let Some(implementation) = implementation else {
            return Some(exported.to_type_ref());
        };
        let anchor = self
            .staged
            .find_assembly_ref(&self.target, &implementation.identity)
            .unwrap_or(implementation);
        Some(reanchor(source, ResolutionScope::Assembly(anchor)))
    }

    /// Stages `mapped` and its scope chain, outermost scope first. Rows the destination
    /// or this operation already has are reused.
    fn intern_chain(&mut self, mapped: &TypeRefRc) -> TypeRefRc {
        let candidate = match &mapped.scope {
            ResolutionScope::Type(outer) => {
                let interned = self.intern_chain(outer);
                if Arc::ptr_eq(&interned, outer) {
                    mapped.clone()
                } else {
                    TypeRef::new(
                        mapped.namespace.clone(),
                        mapped.name.clone(),
                        ResolutionScope::Type(interned),
                    )
                }
            }
            ResolutionScope::Assembly(assembly) => {
                self.staged
                    .stage_row(ReferenceRow::Assembly(assembly.clone()));
                mapped.clone()
            }
            ResolutionScope::Module(module) => {
                self.staged.stage_row(ReferenceRow::Module(module.clone()));
                mapped.clone()
            }
        };

        if let Some(existing) = self.staged.find_type_ref(&self.target, &candidate) {
            return existing;
        }
        self.staged.stage_row(ReferenceRow::Type(candidate.clone()));
        candidate
    }
}

/// Rebuilds the nesting chain of `source` on top of a new outermost scope.
fn reanchor(source: &TypeRef, scope: ResolutionScope) -> TypeRefRc {
    let scope = match source.declaring_type() {
        Some(outer) => ResolutionScope::Type(reanchor(outer, scope)),
        None => scope,
    };
    TypeRef::new(source.namespace.clone(), source.name.clone(), scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{module::Module, references::AssemblyRef},
        resolver::AssemblyResolver,
        test::{assembly, facade, identity, RecordingLocator},
    };

    fn context(locator: &Arc<RecordingLocator>, origin_corlib: &str, target_corlib: &str) -> InjectContext {
        let origin = Module::new("Origin.dll").into_rc();
        origin.set_corlib_ref(AssemblyRef::new(identity(origin_corlib)));
        let target = Module::new("Target.dll").into_rc();
        target.set_corlib_ref(AssemblyRef::new(identity(target_corlib)));

        let resolver = Arc::new(AssemblyResolver::new(locator.clone()));
        InjectContext::new(resolver, Some(origin), target)
    }

    fn source_ref(assembly: &str, namespace: &str, name: &str) -> TypeRefRc {
        TypeRef::new(
            namespace,
            name,
            ResolutionScope::Assembly(AssemblyRef::new(identity(assembly))),
        )
    }

    #[test]
    fn test_fallback_order() {
        let scopes: Vec<_> = FallbackScope::iter().collect();
        assert_eq!(
            scopes,
            vec![
                FallbackScope::TargetCorLib,
                FallbackScope::Netstandard,
                FallbackScope::Mscorlib,
                FallbackScope::DefinitionAssembly,
                FallbackScope::PrivateCoreLib,
            ]
        );
        assert!(!FallbackScope::TargetCorLib.follows_forwarders());
        assert!(FallbackScope::Netstandard.follows_forwarders());
        assert!(FallbackScope::Mscorlib.follows_forwarders());
        assert!(!FallbackScope::PrivateCoreLib.follows_forwarders());
    }

    #[test]
    fn test_same_base_library_is_unchanged() {
        let locator = Arc::new(RecordingLocator::new());
        let mut ctx = context(&locator, "mscorlib", "mscorlib");
        let source = source_ref("mscorlib", "System", "Object");

        assert!(matches!(ctx.map_type_ref(&source), Mapping::Unchanged));
        assert!(locator.requests().is_empty());
    }

    #[test]
    fn test_target_corlib_defines_type() {
        let locator = Arc::new(RecordingLocator::new());
        locator
            .catalog
            .add_global("System.Runtime", || assembly("System.Runtime", &[("System", "Environment")]));
        let mut ctx = context(&locator, "mscorlib", "System.Runtime");
        let source = source_ref("mscorlib", "System", "Environment");

        let Mapping::Mapped(mapped) = ctx.map_type_ref(&source) else {
            panic!("expected a mapping");
        };
        assert_eq!(mapped.definition_assembly().unwrap().name(), "System.Runtime");
        assert_eq!(mapped.full_name(), "System.Environment");
        assert_eq!(ctx.staged().rows().len(), 2);
        assert!(matches!(ctx.staged().rows()[0], ReferenceRow::Assembly(_)));
    }

    #[test]
    fn test_existing_destination_row_is_reused() {
        let locator = Arc::new(RecordingLocator::new());
        locator
            .catalog
            .add_global("System.Runtime", || assembly("System.Runtime", &[("System", "Object")]));
        let mut ctx = context(&locator, "mscorlib", "System.Runtime");
        let corlib = ctx.target.corlib_ref().unwrap();
        let existing = TypeRef::new("System", "Object", ResolutionScope::Assembly(corlib));
        ctx.target
            .references()
            .insert(ReferenceRow::Type(existing.clone()));

        let first = source_ref("mscorlib", "System", "Object");
        let second = source_ref("mscorlib", "System", "Object");
        let Mapping::Mapped(a) = ctx.map_type_ref(&first) else {
            panic!("expected a mapping");
        };
        let Mapping::Mapped(b) = ctx.map_type_ref(&second) else {
            panic!("expected a mapping");
        };

        assert!(Arc::ptr_eq(&a, &existing));
        assert!(Arc::ptr_eq(&b, &existing));
        assert!(Arc::ptr_eq(&ctx.map.type_ref_of(&first).flatten().unwrap(), &existing));
        assert!(!ctx
            .staged()
            .rows()
            .iter()
            .any(|row| matches!(row, ReferenceRow::Type(_))));
    }

    #[test]
    fn test_netstandard_forwarder_is_followed() {
        const EXTENSIONS: &str = "System.Runtime.Extensions";
        let locator = Arc::new(RecordingLocator::new());
        locator
            .catalog
            .add_global(EXTENSIONS, || assembly(EXTENSIONS, &[("System", "Environment")]));
        locator
            .catalog
            .add_global("System.Runtime", || assembly("System.Runtime", &[]));
        locator.catalog.add_global("netstandard", || {
            facade("netstandard", &[("System", "Environment", EXTENSIONS)])
        });
        let mut ctx = context(&locator, "mscorlib", "System.Runtime");
        let source = source_ref("mscorlib", "System", "Environment");

        let Mapping::Mapped(mapped) = ctx.map_type_ref(&source) else {
            panic!("expected a mapping");
        };
        // flattening pulls the definition into netstandard itself
        assert_eq!(mapped.definition_assembly().unwrap().name(), "netstandard");
    }

    #[test]
    fn test_definition_assembly_is_the_fourth_candidate() {
        const EXTENSIONS: &str = "System.Runtime.Extensions";
        let locator = Arc::new(RecordingLocator::new());
        locator
            .catalog
            .add_global("System.Runtime", || assembly("System.Runtime", &[("System", "Object")]));
        locator
            .catalog
            .add_global("mscorlib", || assembly("mscorlib", &[("System", "Object")]));
        locator
            .catalog
            .add_global(EXTENSIONS, || assembly(EXTENSIONS, &[("System", "Environment")]));
        let mut ctx = context(&locator, "mscorlib", "System.Runtime");
        let source = source_ref(EXTENSIONS, "System", "Environment");

        let Mapping::Mapped(mapped) = ctx.map_type_ref(&source) else {
            panic!("expected a mapping");
        };
        assert_eq!(mapped.definition_assembly().unwrap().name(), EXTENSIONS);
        assert_eq!(
            locator.requests(),
            vec!["System.Runtime", "netstandard", "netstandard", "mscorlib", EXTENSIONS]
        );
    }

    #[test]
    fn test_candidates_are_tried_in_a_fixed_order() {
        let register = |locator: &RecordingLocator| {
            for name in ["System.Runtime", "netstandard", "mscorlib", "Vendor.Shim"] {
                locator.catalog.add_global(name, move || assembly(name, &[("System", "Object")]));
            }
            locator.catalog.add_global(PRIVATE_CORELIB, || {
                assembly(PRIVATE_CORELIB, &[("System", "Span`1")])
            });
        };
        let expected = vec![
            "System.Runtime",
            "netstandard",
            "mscorlib",
            "Vendor.Shim",
            PRIVATE_CORELIB,
        ];

        for _ in 0..2 {
            let locator = Arc::new(RecordingLocator::new());
            register(locator.as_ref());
            let mut ctx = context(&locator, "mscorlib", "System.Runtime");
            let source = source_ref("Vendor.Shim", "System", "Span`1");

            let Mapping::Mapped(mapped) = ctx.map_type_ref(&source) else {
                panic!("expected a mapping");
            };
            assert_eq!(mapped.definition_assembly().unwrap().name(), PRIVATE_CORELIB);
            assert_eq!(locator.requests(), expected);
        }
    }

    #[test]
    fn test_exhausted_chain_is_cached() {
        let locator = Arc::new(RecordingLocator::new());
        let mut ctx = context(&locator, "mscorlib", "System.Runtime");
        let source = source_ref("mscorlib", "System", "Environment");

        assert!(matches!(ctx.map_type_ref(&source), Mapping::Unresolved));
        let requests = locator.requests();
        assert_eq!(
            requests,
            vec![
                "System.Runtime",
                "System.Runtime",
                "netstandard",
                "netstandard",
                "mscorlib",
                "mscorlib",
                "System.Private.CoreLib",
                "System.Private.CoreLib",
            ]
        );

        assert!(matches!(ctx.map_type_ref(&source), Mapping::Unresolved));
        assert_eq!(locator.requests().len(), requests.len());
        assert!(ctx.staged().rows().is_empty());
    }

    #[test]
    fn test_nested_reference_is_reanchored_whole() {
        let outer = source_ref("mscorlib", "System", "Environment");
        let inner = TypeRef::new("", "SpecialFolder", ResolutionScope::Type(outer));
        let scope = AssemblyRef::new(identity("System.Runtime"));

        let moved = reanchor(&inner, ResolutionScope::Assembly(scope.clone()));
        assert_eq!(moved.full_name(), "System.Environment/SpecialFolder");
        assert!(Arc::ptr_eq(&moved.definition_assembly().unwrap(), &scope));
    }
}
