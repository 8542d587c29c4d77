//! Assembly resolution.
//!
//! [`AssemblyResolver`] turns an [`AssemblyIdentity`] into a loaded [`Assembly`](crate::metadata::assembly::Assembly).
//! It runs two strategies in sequence, each with its own cache:
//!
//! 1. **exact**: name, version, culture and public key token must agree
//! 2. **fuzzy**: only the name has to agree (plus the key token, when both sides carry
//!    one); among several candidates the best version fit wins
//!
//! Every successful resolution clears a "no platform" architecture marker from the
//! result, and a resolved `netstandard` facade that still forwards types is flattened
//! (see [`facade`]) so later lookups find the definitions directly.
//!
//! Candidates come from an [`AssemblyLocator`]. Search directories are searched in order:
//! pre-search paths, the requesting module's directory, post-search paths.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotgraft::metadata::{
//!     assembly::{Assembly, AssemblyFlags},
//!     identity::AssemblyIdentity,
//! };
//! use dotgraft::resolver::{AssemblyCatalog, AssemblyResolver};
//!
//! let catalog = AssemblyCatalog::new();
//! catalog.add("/deps", "Lib", || {
//!     let identity = AssemblyIdentity::parse("Lib, Version=2.0.0.0").expect("valid name");
//!     Assembly::new(identity, AssemblyFlags::empty())
//! });
//!
//! let resolver = AssemblyResolver::new(Arc::new(catalog)).with_pre_search_path("/deps");
//! let request = AssemblyIdentity::parse("Lib, Version=1.0.0.0")?;
//! let resolved = resolver.resolve(&request, None).expect("fuzzy match");
//! assert_eq!(resolved.identity.version.major, 2);
//! # Ok::<(), dotgraft::Error>(())
//! ```

pub mod facade;
mod locator;
mod paths;
mod strategy;

pub use facade::FlattenReport;
pub use locator::{AssemblyCatalog, AssemblyFactory, AssemblyLocator};
pub use paths::SearchPathList;
pub use strategy::MatchMode;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::metadata::{
    assembly::AssemblyRc, identity::AssemblyIdentity, module::Module, references::AssemblyRef,
};
use paths::SearchPathKind;
use strategy::StrategyResolver;

/// Simple name of the cross-platform compatibility facade.
pub const NETSTANDARD: &str = "netstandard";
/// Simple name of the .NET Framework base library.
pub const MSCORLIB: &str = "mscorlib";
/// Simple name of the .NET Core private base library.
pub const PRIVATE_CORELIB: &str = "System.Private.CoreLib";

/// What to resolve: an identity, or an assembly that is already loaded.
#[derive(Debug, Clone, Copy)]
pub enum ResolutionTarget<'a> {
    /// Look the identity up.
    Identity(&'a AssemblyIdentity),
    /// Already materialized; returned unchanged.
    Assembly(&'a AssemblyRc),
}

impl<'a> From<&'a AssemblyIdentity> for ResolutionTarget<'a> {
    fn from(identity: &'a AssemblyIdentity) -> Self {
        ResolutionTarget::Identity(identity)
    }
}

impl<'a> From<&'a AssemblyRef> for ResolutionTarget<'a> {
    fn from(reference: &'a AssemblyRef) -> Self {
        ResolutionTarget::Identity(&reference.identity)
    }
}

impl<'a> From<&'a AssemblyRc> for ResolutionTarget<'a> {
    fn from(assembly: &'a AssemblyRc) -> Self {
        ResolutionTarget::Assembly(assembly)
    }
}

/// Two-strategy assembly resolver with shared search paths.
pub struct AssemblyResolver {
    exact: StrategyResolver,
    fuzzy: StrategyResolver,
    mutation: Mutex<()>,
}

impl AssemblyResolver {
    /// Creates a resolver drawing candidates from `locator`.
    #[must_use]
    pub fn new(locator: Arc<dyn AssemblyLocator>) -> Self {
        AssemblyResolver {
            exact: StrategyResolver::new(MatchMode::Exact, locator.clone()),
            fuzzy: StrategyResolver::new(MatchMode::Fuzzy, locator),
            mutation: Mutex::new(()),
        }
    }

    /// Adds a directory searched before the requesting module's directory.
    #[must_use]
    pub fn with_pre_search_path(self, path: impl Into<PathBuf>) -> Self {
        self.pre_search_paths().push(path);
        self
    }

    /// Adds a directory searched after the requesting module's directory.
    #[must_use]
    pub fn with_post_search_path(self, path: impl Into<PathBuf>) -> Self {
        self.post_search_paths().push(path);
        self
    }

    /// Enables or disables probing the requesting module's directory (enabled by default).
    #[must_use]
    pub fn use_module_directory(self, enabled: bool) -> Self {
        self.exact.set_use_module_directory(enabled);
        self.fuzzy.set_use_module_directory(enabled);
        self
    }

    /// Resolves `target` on behalf of `requesting`.
    ///
    /// Returns `None` if neither strategy finds a match. An already loaded assembly is
    /// returned as is.
    pub fn resolve<'a>(
        &self,
        target: impl Into<ResolutionTarget<'a>>,
        requesting: Option<&Module>,
    ) -> Option<AssemblyRc> {
        let identity = match target.into() {
            ResolutionTarget::Assembly(assembly) => return Some(assembly.clone()),
            ResolutionTarget::Identity(identity) => identity,
        };

        let _guard = lock!(self.mutation);
        let Some(assembly) = self.resolve_unlocked(identity, requesting) else {
            log::debug!("unable to resolve {}", identity.display_name());
            return None;
        };

        if assembly.normalize_platform() {
            log::debug!("cleared platform flags of {}", assembly.name());
        }
        if assembly.name().eq_ignore_ascii_case(NETSTANDARD)
            && !assembly.exported_types().is_empty()
        {
            self.flatten_unlocked(&assembly);
        }

        Some(assembly)
    }

    fn resolve_unlocked(
        &self,
        identity: &AssemblyIdentity,
        requesting: Option<&Module>,
    ) -> Option<AssemblyRc> {
        self.exact
            .resolve(identity, requesting)
            .or_else(|| self.fuzzy.resolve(identity, requesting))
    }

    /// Merges the implementation assemblies of `facade` into it.
    ///
    /// Implementation assemblies whose types were moved are evicted from both caches.
    /// Flattening a facade without forwarding entries does nothing.
    pub fn flatten_facade(&self, facade: &AssemblyRc) -> FlattenReport {
        let _guard = lock!(self.mutation);
        self.flatten_unlocked(facade)
    }

    fn flatten_unlocked(&self, facade: &AssemblyRc) -> FlattenReport {
        let report = facade::flatten(facade, |identity, requesting| {
            self.resolve_unlocked(identity, Some(requesting))
        });
        for implementation in &report.touched {
            self.exact.remove(implementation);
            self.fuzzy.remove(implementation);
        }
        report
    }

    /// Drops every cached assembly from both strategies.
    pub fn clear(&self) {
        let _guard = lock!(self.mutation);
        self.exact.clear();
        self.fuzzy.clear();
    }

    /// Cached assemblies, exact strategy first.
    #[must_use]
    pub fn cached_assemblies(&self) -> Vec<AssemblyRc> {
        let mut cached = self.exact.cached();
        cached.extend(self.fuzzy.cached());
        cached
    }

    /// Seeds both caches with `assembly`. Returns true if either cache did not know it.
    pub fn add_to_cache(&self, assembly: &AssemblyRc) -> bool {
        let _guard = lock!(self.mutation);
        let exact = self.exact.add_to_cache(assembly.clone());
        let fuzzy = self.fuzzy.add_to_cache(assembly.clone());
        exact || fuzzy
    }

    /// Evicts `assembly` from both caches. Returns true if either cache held it.
    pub fn remove(&self, assembly: &AssemblyRc) -> bool {
        let _guard = lock!(self.mutation);
        let exact = self.exact.remove(assembly);
        let fuzzy = self.fuzzy.remove(assembly);
        exact || fuzzy
    }

    /// Directories searched before the requesting module's directory.
    #[must_use]
    pub fn pre_search_paths(&self) -> SearchPathList<'_> {
        SearchPathList::new([&self.exact, &self.fuzzy], SearchPathKind::Pre)
    }

    /// Directories searched after the requesting module's directory.
    #[must_use]
    pub fn post_search_paths(&self) -> SearchPathList<'_> {
        SearchPathList::new([&self.exact, &self.fuzzy], SearchPathKind::Post)
    }
}

impl std::fmt::Debug for AssemblyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssemblyResolver")
            .field("exact", &self.exact.cached().len())
            .field("fuzzy", &self.fuzzy.cached().len())
            .finish()
    }
}
