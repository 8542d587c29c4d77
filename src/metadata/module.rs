//! Modules: the unit that owns type definitions and a reference space.
//!
//! A [`Module`] keeps its top-level types, the type-forwarding entries it exports, the
//! [`ReferenceTable`] of everything foreign it mentions, and which assembly reference it
//! treats as its base library. Definitions point back at their module through weak
//! handles, so a module can be dropped while clones of its types survive elsewhere.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock, Weak},
};

use crate::metadata::{
    assembly::{Assembly, AssemblyRc},
    identity::AssemblyIdentity,
    references::{AssemblyRefRc, ExportedTypeRc, ModuleRefRc, TypeRef},
    reftable::{ReferenceRow, ReferenceTable},
    typedef::TypeDefRc,
};

/// A reference to a [`Module`]
pub type ModuleRc = Arc<Module>;

/// A module of an assembly.
pub struct Module {
    /// File name of the module.
    pub name: String,
    location: Option<PathBuf>,
    assembly: RwLock<Weak<Assembly>>,
    types: RwLock<Vec<TypeDefRc>>,
    exported_types: RwLock<Vec<ExportedTypeRc>>,
    corlib: RwLock<Option<AssemblyRefRc>>,
    references: ReferenceTable,
}

impl Module {
    /// Creates an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            location: None,
            assembly: RwLock::new(Weak::new()),
            types: RwLock::new(Vec::new()),
            exported_types: RwLock::new(Vec::new()),
            corlib: RwLock::new(None),
            references: ReferenceTable::new(),
        }
    }

    /// Builder helper: records where the module was loaded from.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Wraps the module into a shared handle.
    #[must_use]
    pub fn into_rc(self) -> ModuleRc {
        Arc::new(self)
    }

    /// On-disk location, if known.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Directory containing the module file.
    #[must_use]
    pub fn directory(&self) -> Option<PathBuf> {
        self.location
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
    }

    /// The assembly this module belongs to.
    #[must_use]
    pub fn assembly(&self) -> Option<AssemblyRc> {
        read_lock!(self.assembly).upgrade()
    }

    pub(crate) fn set_assembly(&self, assembly: Weak<Assembly>) {
        *write_lock!(self.assembly) = assembly;
    }

    /// Identity of the owning assembly.
    #[must_use]
    pub fn assembly_identity(&self) -> Option<AssemblyIdentity> {
        self.assembly().map(|assembly| assembly.identity.clone())
    }

    /// Top-level types in declaration order.
    #[must_use]
    pub fn types(&self) -> Vec<TypeDefRc> {
        read_lock!(self.types).clone()
    }

    /// Appends a top-level type and points its back reference here.
    pub fn add_type(self: &Arc<Self>, ty: TypeDefRc) {
        ty.set_module(Arc::downgrade(self));
        write_lock!(self.types).push(ty);
    }

    /// Removes and returns all top-level types.
    pub fn take_types(&self) -> Vec<TypeDefRc> {
        std::mem::take(&mut *write_lock!(self.types))
    }

    /// The top-level type `namespace.name`.
    #[must_use]
    pub fn find_type(&self, namespace: &str, name: &str) -> Option<TypeDefRc> {
        read_lock!(self.types)
            .iter()
            .find(|ty| ty.namespace == namespace && ty.name == name)
            .cloned()
    }

    /// The definition a type reference names, walking its declaring chain.
    ///
    /// Only names are compared; the scope of the reference is not checked against this
    /// module.
    #[must_use]
    pub fn find_type_by_ref(&self, reference: &TypeRef) -> Option<TypeDefRc> {
        match reference.declaring_type() {
            Some(outer) => self
                .find_type_by_ref(outer)
                .and_then(|outer| outer.find_nested_type(&reference.name)),
            None => self.find_type(&reference.namespace, &reference.name),
        }
    }

    /// Type-forwarding entries.
    #[must_use]
    pub fn exported_types(&self) -> Vec<ExportedTypeRc> {
        read_lock!(self.exported_types).clone()
    }

    /// Adds a type-forwarding entry.
    pub fn add_exported_type(&self, exported: ExportedTypeRc) {
        write_lock!(self.exported_types).push(exported);
    }

    /// Removes and returns all type-forwarding entries.
    pub fn take_exported_types(&self) -> Vec<ExportedTypeRc> {
        std::mem::take(&mut *write_lock!(self.exported_types))
    }

    /// The assembly reference treated as this module's base library.
    #[must_use]
    pub fn corlib_ref(&self) -> Option<AssemblyRefRc> {
        read_lock!(self.corlib).clone()
    }

    /// Sets the base-library reference and registers it in the reference table.
    pub fn set_corlib_ref(&self, corlib: AssemblyRefRc) {
        self.references.insert(ReferenceRow::Assembly(corlib.clone()));
        *write_lock!(self.corlib) = Some(corlib);
    }

    /// The reference space of this module.
    #[must_use]
    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    /// Registered assembly references.
    #[must_use]
    pub fn assembly_refs(&self) -> Vec<AssemblyRefRc> {
        self.references.assembly_refs()
    }

    /// The first assembly reference whose simple name matches `name`, ignoring case.
    #[must_use]
    pub fn get_assembly_ref(&self, name: &str) -> Option<AssemblyRefRc> {
        self.references
            .assembly_refs()
            .into_iter()
            .find(|assembly| assembly.name().eq_ignore_ascii_case(name))
    }

    /// The module reference called `name`, ignoring case.
    #[must_use]
    pub fn get_module_ref(&self, name: &str) -> Option<ModuleRefRc> {
        self.references
            .module_refs()
            .into_iter()
            .find(|module| module.name.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("types", &read_lock!(self.types).len())
            .field("exported_types", &read_lock!(self.exported_types).len())
            .field("references", &self.references.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{
        references::{AssemblyRef, ResolutionScope},
        typedef::{TypeAttributes, TypeDef},
    };

    #[test]
    fn test_find_type_by_ref_walks_nesting() {
        let module = Module::new("Lib.dll").into_rc();
        let outer = TypeDef::new("N", "Outer", TypeAttributes::PUBLIC).into_rc();
        let inner = TypeDef::new("", "Inner", TypeAttributes::NESTED_PUBLIC).into_rc();
        outer.add_nested_type(inner.clone());
        module.add_type(outer.clone());

        let scope = AssemblyRef::new(AssemblyIdentity::named("Lib"));
        let outer_ref = TypeRef::new("N", "Outer", ResolutionScope::Assembly(scope));
        let inner_ref = TypeRef::new("", "Inner", ResolutionScope::Type(outer_ref.clone()));

        assert!(Arc::ptr_eq(&module.find_type_by_ref(&outer_ref).unwrap(), &outer));
        assert!(Arc::ptr_eq(&module.find_type_by_ref(&inner_ref).unwrap(), &inner));
        assert!(Arc::ptr_eq(&inner.module().unwrap(), &module));
    }

    #[test]
    fn test_corlib_ref_is_registered() {
        let module = Module::new("App.exe")
            .with_location("/apps/demo/App.exe")
            .into_rc();
        let corlib = AssemblyRef::new(AssemblyIdentity::named("mscorlib"));
        module.set_corlib_ref(corlib.clone());

        assert!(Arc::ptr_eq(&module.corlib_ref().unwrap(), &corlib));
        assert!(Arc::ptr_eq(&module.get_assembly_ref("MSCORLIB").unwrap(), &corlib));
        assert_eq!(module.directory(), Some(PathBuf::from("/apps/demo")));
    }

    #[test]
    fn test_take_types_empties_module() {
        let module = Module::new("Lib.dll").into_rc();
        module.add_type(TypeDef::new("N", "A", TypeAttributes::PUBLIC).into_rc());
        module.add_type(TypeDef::new("N", "B", TypeAttributes::PUBLIC).into_rc());

        let taken = module.take_types();
        assert_eq!(taken.len(), 2);
        assert!(module.types().is_empty());
    }
}
