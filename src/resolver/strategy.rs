//! A single resolution strategy with its own cache and search paths.

use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};

use dashmap::DashMap;
use strum::Display;

use crate::{
    metadata::{assembly::AssemblyRc, identity::AssemblyIdentity, module::Module},
    resolver::locator::AssemblyLocator,
};

/// How a strategy decides that a candidate satisfies a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MatchMode {
    /// Name, version, culture and key token must all agree.
    #[strum(serialize = "exact")]
    Exact,
    /// Name must agree, key tokens only when both sides have one.
    #[strum(serialize = "fuzzy")]
    Fuzzy,
}

impl MatchMode {
    fn accepts(self, candidate: &AssemblyIdentity, requested: &AssemblyIdentity) -> bool {
        match self {
            MatchMode::Exact => candidate.matches_exactly(requested),
            MatchMode::Fuzzy => candidate.matches_loosely(requested),
        }
    }
}

pub(crate) struct StrategyResolver {
    mode: MatchMode,
    locator: Arc<dyn AssemblyLocator>,
    cache: DashMap<String, AssemblyRc>,
    pub(crate) pre_search_paths: RwLock<Vec<PathBuf>>,
    pub(crate) post_search_paths: RwLock<Vec<PathBuf>>,
    use_module_directory: AtomicBool,
}

impl StrategyResolver {
    pub(crate) fn new(mode: MatchMode, locator: Arc<dyn AssemblyLocator>) -> Self {
        StrategyResolver {
            mode,
            locator,
            cache: DashMap::new(),
            pre_search_paths: RwLock::new(Vec::new()),
            post_search_paths: RwLock::new(Vec::new()),
            use_module_directory: AtomicBool::new(true),
        }
    }

    pub(crate) fn mode(&self) -> MatchMode {
        self.mode
    }

    pub(crate) fn set_use_module_directory(&self, enabled: bool) {
        self.use_module_directory.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn resolve(
        &self,
        requested: &AssemblyIdentity,
        requesting: Option<&Module>,
    ) -> Option<AssemblyRc> {
        let cached: Vec<AssemblyRc> = self
            .cache
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        if let Some(hit) = self.select(requested, cached) {
            return Some(hit);
        }

        let directories = self.search_directories(requesting);
        let candidates = self.locator.locate(&requested.name, &directories);
        let chosen = self.select(requested, candidates)?;

        self.cache
            .insert(cache_key(&chosen.identity), chosen.clone());
        log::debug!(
            "{} resolver cached {} for request {}",
            self.mode,
            chosen.identity.display_name(),
            requested.display_name()
        );
        Some(chosen)
    }

    /// Pre-search paths, the requesting module's directory, post-search paths.
    fn search_directories(&self, requesting: Option<&Module>) -> Vec<PathBuf> {
        let mut directories = read_lock!(self.pre_search_paths).clone();
        if self.use_module_directory.load(Ordering::Relaxed) {
            if let Some(directory) = requesting.and_then(Module::directory) {
                if !directories.contains(&directory) {
                    directories.push(directory);
                }
            }
        }
        for directory in read_lock!(self.post_search_paths).iter() {
            if !directories.contains(directory) {
                directories.push(directory.clone());
            }
        }
        directories
    }

    fn select(
        &self,
        requested: &AssemblyIdentity,
        candidates: Vec<AssemblyRc>,
    ) -> Option<AssemblyRc> {
        let mut accepted = candidates
            .into_iter()
            .filter(|candidate| self.mode.accepts(&candidate.identity, requested));

        match self.mode {
            MatchMode::Exact => accepted.next(),
            MatchMode::Fuzzy => accepted.reduce(|best, candidate| {
                if is_better_fit(&candidate.identity, &best.identity, requested) {
                    candidate
                } else {
                    best
                }
            }),
        }
    }

    pub(crate) fn cached(&self) -> Vec<AssemblyRc> {
        self.cache.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Returns false if an assembly with the same identity is already cached.
    pub(crate) fn add_to_cache(&self, assembly: AssemblyRc) -> bool {
        let key = cache_key(&assembly.identity);
        if self.cache.contains_key(&key) {
            return false;
        }
        self.cache.insert(key, assembly);
        true
    }

    pub(crate) fn remove(&self, assembly: &AssemblyRc) -> bool {
        let before = self.cache.len();
        self.cache.retain(|_, cached| !Arc::ptr_eq(cached, assembly));
        self.cache.len() != before
    }

    pub(crate) fn clear(&self) {
        self.cache.clear();
    }
}

fn cache_key(identity: &AssemblyIdentity) -> String {
    identity.display_name().to_ascii_lowercase()
}

/// A binding-compatible version beats an incompatible one; otherwise the version
/// closer to the request wins.
fn is_better_fit(
    candidate: &AssemblyIdentity,
    best: &AssemblyIdentity,
    requested: &AssemblyIdentity,
) -> bool {
    let candidate_fits = candidate.version.is_compatible_with(&requested.version);
    let best_fits = best.version.is_compatible_with(&requested.version);
    if candidate_fits != best_fits {
        return candidate_fits;
    }

    candidate
        .version
        .is_closer_to(&best.version, &requested.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::assembly::{Assembly, AssemblyFlags},
        resolver::locator::AssemblyCatalog,
    };

    fn assembly(display_name: &str) -> AssemblyRc {
        Assembly::new(
            AssemblyIdentity::parse(display_name).unwrap(),
            AssemblyFlags::empty(),
        )
    }

    fn strategy(mode: MatchMode, catalog: AssemblyCatalog) -> StrategyResolver {
        let resolver = StrategyResolver::new(mode, Arc::new(catalog));
        write_lock!(resolver.pre_search_paths).push(PathBuf::from("/lib"));
        resolver
    }

    #[test]
    fn test_exact_requires_version() {
        let catalog = AssemblyCatalog::new();
        catalog.add("/lib", "Lib", || assembly("Lib, Version=2.0.0.0"));
        let exact = strategy(MatchMode::Exact, catalog);

        let request = AssemblyIdentity::parse("Lib, Version=1.0.0.0").unwrap();
        assert!(exact.resolve(&request, None).is_none());
        assert!(exact.cached().is_empty());
    }

    #[test]
    fn test_fuzzy_prefers_compatible_then_highest() {
        let catalog = AssemblyCatalog::new();
        for version in ["3.9.0.0", "4.2.0.0", "4.5.0.0", "5.0.0.0"] {
            let display_name = format!("Lib, Version={version}");
            catalog.add("/lib", "Lib", move || assembly(&display_name));
        }
        let fuzzy = strategy(MatchMode::Fuzzy, catalog);

        let request = AssemblyIdentity::parse("Lib, Version=4.0.0.0").unwrap();
        let chosen = fuzzy.resolve(&request, None).unwrap();
        assert_eq!(chosen.identity.version.minor, 5);

        let again = fuzzy.resolve(&request, None).unwrap();
        assert!(Arc::ptr_eq(&again, &chosen));
        assert_eq!(fuzzy.cached().len(), 1);
    }

    #[test]
    fn test_module_directory_is_searched_between_search_paths() {
        let catalog = AssemblyCatalog::new();
        catalog.add("/app", "Lib", || assembly("Lib, Version=1.0.0.0"));
        let exact = StrategyResolver::new(MatchMode::Exact, Arc::new(catalog));
        let requesting = Module::new("App.exe").with_location("/app/App.exe");

        let request = AssemblyIdentity::parse("Lib, Version=1.0.0.0").unwrap();
        assert!(exact.resolve(&request, Some(&requesting)).is_some());

        exact.clear();
        exact.set_use_module_directory(false);
        assert!(exact.resolve(&request, Some(&requesting)).is_none());
    }

    #[test]
    fn test_add_and_remove() {
        let exact = StrategyResolver::new(MatchMode::Exact, Arc::new(AssemblyCatalog::new()));
        let lib = assembly("Lib, Version=1.0.0.0");

        assert!(exact.add_to_cache(lib.clone()));
        assert!(!exact.add_to_cache(lib.clone()));
        assert!(exact.remove(&lib));
        assert!(!exact.remove(&lib));
        assert_eq!(exact.mode(), MatchMode::Exact);
    }
}
