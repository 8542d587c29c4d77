//! Shared fixtures for unit tests.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::{
    metadata::{
        assembly::{Assembly, AssemblyFlags, AssemblyRc},
        identity::AssemblyIdentity,
        module::{Module, ModuleRc},
        references::{
            AssemblyRef, ExportedImplementation, ExportedType, ResolutionScope, TypeRef,
            TypeRefRc,
        },
        reftable::ReferenceRow,
        typedef::{TypeAttributes, TypeDef},
    },
    resolver::{AssemblyCatalog, AssemblyLocator, AssemblyResolver},
};

// Helper function to parse an assembly display name
pub fn identity(display_name: &str) -> AssemblyIdentity {
    AssemblyIdentity::parse(display_name).unwrap()
}

// Helper function to create an assembly with a single module holding `types`
pub fn assembly(display_name: &str, types: &[(&str, &str)]) -> AssemblyRc {
    let identity = identity(display_name);
    let module = Module::new(format!("{}.dll", identity.name)).into_rc();
    for (namespace, name) in types {
        module.add_type(TypeDef::new(*namespace, *name, TypeAttributes::PUBLIC).into_rc());
    }

    let assembly = Assembly::new(identity, AssemblyFlags::empty());
    assembly.add_module(module);
    assembly
}

// Helper function to create a facade forwarding each type to the named implementation assembly
pub fn facade(display_name: &str, forwards: &[(&str, &str, &str)]) -> AssemblyRc {
    let facade = assembly(display_name, &[]);
    let manifest = module_of(&facade);

    for (namespace, name, implementation) in forwards {
        let implementation = identity(implementation);
        let reference = manifest
            .get_assembly_ref(&implementation.name)
            .unwrap_or_else(|| {
                let reference = AssemblyRef::new(implementation);
                manifest
                    .references()
                    .insert(ReferenceRow::Assembly(reference.clone()));
                reference
            });
        manifest.add_exported_type(ExportedType::new(
            *namespace,
            *name,
            ExportedImplementation::Assembly(reference),
        ));
    }

    facade
}

// Helper function to get the manifest module of an assembly
pub fn module_of(assembly: &AssemblyRc) -> ModuleRc {
    assembly.manifest_module().unwrap()
}

// Helper function to create a type reference scoped at an assembly
pub fn type_ref(assembly: &str, namespace: &str, name: &str) -> TypeRefRc {
    TypeRef::new(
        namespace,
        name,
        ResolutionScope::Assembly(AssemblyRef::new(identity(assembly))),
    )
}

// Helper function to create a resolver that finds nothing
pub fn empty_resolver() -> Arc<AssemblyResolver> {
    Arc::new(AssemblyResolver::new(Arc::new(AssemblyCatalog::new())))
}

/// Catalog-backed locator that records every requested name.
#[derive(Default)]
pub struct RecordingLocator {
    pub catalog: AssemblyCatalog,
    requests: Mutex<Vec<String>>,
}

impl RecordingLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<String> {
        lock!(self.requests).clone()
    }
}

impl AssemblyLocator for RecordingLocator {
    fn locate(&self, name: &str, directories: &[PathBuf]) -> Vec<AssemblyRc> {
        lock!(self.requests).push(name.to_string());
        self.catalog.locate(name, directories)
    }
}
