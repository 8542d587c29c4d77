//! Finding assembly candidates on behalf of the resolver.
//!
//! Reading PE files is not part of this crate. The resolver asks an [`AssemblyLocator`]
//! for candidates instead; a real host plugs in a locator backed by its loader, tests
//! and tools use the in-memory [`AssemblyCatalog`].
//!
//! The resolver mutates what it resolves: platform flags are cleared and facade
//! implementation assemblies are emptied into the facade. A locator therefore loads a
//! new [`Assembly`](crate::metadata::assembly::Assembly) on every lookup and never hands
//! out an object it returned before.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use dashmap::DashMap;

use crate::metadata::assembly::AssemblyRc;

/// Source of assembly candidates for a simple name.
pub trait AssemblyLocator: Send + Sync {
    /// Freshly loaded candidates called `name`, searched in `directories` in order, then
    /// in any location the locator knows without a directory (a global cache).
    fn locate(&self, name: &str, directories: &[PathBuf]) -> Vec<AssemblyRc>;
}

/// Loads one assembly image. Every call builds a new object.
pub type AssemblyFactory = Arc<dyn Fn() -> AssemblyRc + Send + Sync>;

#[derive(Clone)]
struct CatalogEntry {
    name: String,
    load: AssemblyFactory,
}

impl CatalogEntry {
    fn new(name: impl Into<String>, load: impl Fn() -> AssemblyRc + Send + Sync + 'static) -> Self {
        CatalogEntry {
            name: name.into(),
            load: Arc::new(load),
        }
    }
}

/// In-memory locator: assembly factories registered per directory plus a global list.
#[derive(Default)]
pub struct AssemblyCatalog {
    directories: DashMap<PathBuf, Vec<CatalogEntry>>,
    global: RwLock<Vec<CatalogEntry>>,
}

impl AssemblyCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the assembly called `name` as living in `directory`.
    ///
    /// `load` runs once per lookup that finds the entry.
    pub fn add(
        &self,
        directory: impl Into<PathBuf>,
        name: impl Into<String>,
        load: impl Fn() -> AssemblyRc + Send + Sync + 'static,
    ) {
        self.directories
            .entry(directory.into())
            .or_default()
            .push(CatalogEntry::new(name, load));
    }

    /// Registers the assembly called `name` as reachable from anywhere.
    pub fn add_global(
        &self,
        name: impl Into<String>,
        load: impl Fn() -> AssemblyRc + Send + Sync + 'static,
    ) {
        write_lock!(self.global).push(CatalogEntry::new(name, load));
    }

    /// Names registered for `directory`, in registration order.
    #[must_use]
    pub fn names_in(&self, directory: &Path) -> Vec<String> {
        self.directories
            .get(directory)
            .map(|entry| entry.value().iter().map(|e| e.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of registrations, global ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        let scoped: usize = self.directories.iter().map(|entry| entry.value().len()).sum();
        scoped + read_lock!(self.global).len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssemblyLocator for AssemblyCatalog {
    fn locate(&self, name: &str, directories: &[PathBuf]) -> Vec<AssemblyRc> {
        let mut matching: Vec<CatalogEntry> = Vec::new();
        let mut push = |entry: &CatalogEntry| {
            if entry.name.eq_ignore_ascii_case(name)
                && !matching.iter().any(|seen| Arc::ptr_eq(&seen.load, &entry.load))
            {
                matching.push(entry.clone());
            }
        };

        for directory in directories {
            if let Some(entry) = self.directories.get(directory) {
                entry.value().iter().for_each(&mut push);
            }
        }
        read_lock!(self.global).iter().for_each(&mut push);

        matching.iter().map(|entry| (entry.load)()).collect()
    }
}
