//! Assembly resolution through the public API.

mod common;

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use common::*;
use dotgraft::prelude::*;

/// Wraps a catalog and records every directory list it is searched with.
struct RecordingCatalog {
    catalog: AssemblyCatalog,
    seen: Mutex<Vec<(String, Vec<PathBuf>)>>,
}

impl RecordingCatalog {
    fn new(catalog: AssemblyCatalog) -> Self {
        RecordingCatalog {
            catalog,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.seen.lock().unwrap().clone()
    }
}

impl AssemblyLocator for RecordingCatalog {
    fn locate(&self, name: &str, directories: &[PathBuf]) -> Vec<AssemblyRc> {
        self.seen
            .lock()
            .unwrap()
            .push((name.to_string(), directories.to_vec()));
        self.catalog.locate(name, directories)
    }
}

/// `Lib 1.0.0.0` defining a single type in namespace `origin`, to tell copies apart.
fn lib_from(origin: &'static str) -> impl Fn() -> AssemblyRc + Send + Sync + 'static {
    move || assembly("Lib, Version=1.0.0.0", &[(origin, "Marker")])
}

fn origin_of(assembly: &AssemblyRc) -> String {
    manifest(assembly).types()[0].namespace.clone()
}

#[test]
fn search_order_pre_module_post() {
    let catalog = AssemblyCatalog::new();
    catalog.add("/post", "Lib", lib_from("post"));
    catalog.add("/app", "Lib", lib_from("app"));
    catalog.add("/pre", "Lib", lib_from("pre"));
    let recorder = Arc::new(RecordingCatalog::new(catalog));

    let resolver = AssemblyResolver::new(recorder.clone())
        .with_pre_search_path("/pre")
        .with_post_search_path("/post");
    let requesting = Module::new("App.exe").with_location("/app/App.exe");

    let resolved = resolver
        .resolve(&identity("Lib, Version=1.0.0.0"), Some(&requesting))
        .unwrap();
    assert_eq!(origin_of(&resolved), "pre");

    let seen = recorder.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "Lib");
    assert_eq!(
        seen[0].1,
        [PathBuf::from("/pre"), PathBuf::from("/app"), PathBuf::from("/post")]
    );

    // once cached, the locator is not asked again
    let again = resolver
        .resolve(&identity("Lib, Version=1.0.0.0"), Some(&requesting))
        .unwrap();
    assert!(Arc::ptr_eq(&again, &resolved));
    assert_eq!(recorder.seen().len(), 1);
}

#[test]
fn module_directory_can_be_disabled() {
    let catalog = AssemblyCatalog::new();
    catalog.add("/app", "Lib", lib_from("app"));
    let resolver = AssemblyResolver::new(Arc::new(catalog)).use_module_directory(false);
    let requesting = Module::new("App.exe").with_location("/app/App.exe");

    assert!(resolver
        .resolve(&identity("Lib, Version=1.0.0.0"), Some(&requesting))
        .is_none());
}

#[test]
fn fuzzy_picks_the_best_version() {
    let catalog = AssemblyCatalog::new();
    for version in ["1.0.0.0", "2.1.0.0", "2.4.0.0", "3.0.0.0"] {
        let display_name = format!("Lib, Version={version}");
        catalog.add_global("Lib", move || assembly(&display_name, &[]));
    }
    let recorder = Arc::new(RecordingCatalog::new(catalog));
    let resolver = AssemblyResolver::new(recorder.clone());

    let resolved = resolver
        .resolve(&identity("Lib, Version=2.0.0.0"), None)
        .unwrap();
    assert_eq!(resolved.identity.version.major, 2);
    assert_eq!(resolved.identity.version.minor, 4);
    // exact strategy searched and failed, then fuzzy
    assert_eq!(recorder.seen().len(), 2);

    let exact = resolver
        .resolve(&identity("Lib, Version=3.0.0.0"), None)
        .unwrap();
    assert_eq!(exact.identity.version.major, 3);
}

#[test]
fn unresolved_lookups_are_not_cached() {
    let recorder = Arc::new(RecordingCatalog::new(AssemblyCatalog::new()));
    let resolver = AssemblyResolver::new(recorder.clone());

    assert!(resolver.resolve(&identity("Missing"), None).is_none());
    assert!(resolver.resolve(&identity("Missing"), None).is_none());
    assert_eq!(recorder.seen().len(), 4);
    assert!(resolver.cached_assemblies().is_empty());
}

#[test]
fn netstandard_is_flattened_on_resolve() {
    let catalog = AssemblyCatalog::new();
    catalog.add_global("System.Runtime", || {
        assembly(SYSTEM_RUNTIME, &[("System", "Object"), ("System", "String")])
    });
    catalog.add_global("netstandard", || {
        facade(
            NETSTANDARD,
            &[("System", "Object", SYSTEM_RUNTIME), ("System", "String", SYSTEM_RUNTIME)],
        )
    });
    let resolver = AssemblyResolver::new(Arc::new(catalog));
    let runtime = resolver.resolve(&identity(SYSTEM_RUNTIME), None).unwrap();

    let netstandard = resolver.resolve(&identity(NETSTANDARD), None).unwrap();

    assert!(netstandard.exported_types().is_empty());
    assert_eq!(netstandard.flags(), AssemblyFlags::empty());
    let object = TypeRef::new(
        "System",
        "Object",
        ResolutionScope::Assembly(netstandard.to_assembly_ref()),
    );
    assert!(netstandard.type_exists(&object));
    assert!(!runtime.type_exists(&object));

    // the emptied implementation assembly is no longer served from the cache
    assert!(resolver
        .cached_assemblies()
        .iter()
        .all(|cached| !Arc::ptr_eq(cached, &runtime)));
    let reloaded = resolver.resolve(&identity(SYSTEM_RUNTIME), None).unwrap();
    assert!(reloaded.type_exists(&object));
}

#[test]
fn flatten_reports_unresolved_forwards() {
    const PRESENT: &str = "Present, Version=1.0.0.0";
    let netstandard = facade(
        NETSTANDARD,
        &[("N", "Here", PRESENT), ("N", "Gone", "Absent, Version=1.0.0.0")],
    );
    let catalog = AssemblyCatalog::new();
    catalog.add_global("Present", || assembly(PRESENT, &[("N", "Here")]));
    let resolver = AssemblyResolver::new(Arc::new(catalog));

    let report = resolver.flatten_facade(&netstandard);

    assert_eq!(report.moved_types, 1);
    assert_eq!(report.touched.len(), 1);
    assert_eq!(report.touched[0].name(), "Present");
    assert!(manifest(&report.touched[0]).types().is_empty());
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].full_name(), "N.Gone");
    assert_eq!(netstandard.exported_types().len(), 1);

    // a second flatten finds nothing left to move
    let again = resolver.flatten_facade(&netstandard);
    assert_eq!(again.moved_types, 0);
}

#[test]
fn search_path_lists_stay_in_sync() {
    let resolver = AssemblyResolver::new(Arc::new(AssemblyCatalog::new()));
    let pre = resolver.pre_search_paths();

    pre.push("/b");
    pre.insert(0, "/a");
    pre.insert(10, "/c");
    assert_eq!(pre.to_vec(), [PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")]);
    assert!(pre.contains(Path::new("/b")));

    assert!(pre.remove(Path::new("/b")));
    assert!(!pre.remove(Path::new("/b")));
    assert_eq!(pre.remove_at(0), Some(PathBuf::from("/a")));
    assert_eq!(pre.remove_at(5), None);
    assert_eq!(pre.len(), 1);
    assert_eq!(pre.get(0), Some(PathBuf::from("/c")));

    pre.clear();
    assert!(pre.is_empty());
    assert!(resolver.post_search_paths().is_empty());
}

#[test]
fn cache_management() {
    let resolver = AssemblyResolver::new(Arc::new(AssemblyCatalog::new()));
    let seeded = assembly("Seeded, Version=1.0.0.0", &[]);

    assert!(resolver.add_to_cache(&seeded));
    assert!(!resolver.add_to_cache(&seeded));
    let resolved = resolver
        .resolve(&identity("Seeded, Version=1.0.0.0"), None)
        .unwrap();
    assert!(Arc::ptr_eq(&resolved, &seeded));

    assert!(resolver.remove(&seeded));
    assert!(resolver.resolve(&identity("Seeded"), None).is_none());

    resolver.add_to_cache(&seeded);
    resolver.clear();
    assert!(resolver.cached_assemblies().is_empty());
}
