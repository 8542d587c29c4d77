//! Cross-module injection of types, members and method references.
//!
//! An [`Injector`] clones definitions out of one module into another. Each call runs one
//! operation with its own [`InjectContext`]: shells for the whole source graph are
//! registered first, then signatures and bodies are copied through an [`Importer`] that
//! rebinds every reference to the destination. References that cross base libraries
//! (a `mscorlib` type used from a `System.Runtime` module, say) are re-anchored by the
//! fallback chain in [`mapper`], backed by the shared [`AssemblyResolver`].
//!
//! Nothing is written into the destination until the operation succeeds; a failed call
//! leaves the destination module unchanged.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use dotgraft::prelude::*;
//!
//! let lib = Assembly::new(AssemblyIdentity::named("Lib"), AssemblyFlags::empty());
//! let origin = Module::new("Lib.dll").into_rc();
//! lib.add_module(origin.clone());
//! let helper = TypeDef::new("Lib", "Helper", TypeAttributes::PUBLIC).into_rc();
//! origin.add_type(helper.clone());
//!
//! let app = Assembly::new(AssemblyIdentity::named("App"), AssemblyFlags::empty());
//! let target = Module::new("App.exe").into_rc();
//! app.add_module(target.clone());
//!
//! let injector = Injector::new(Arc::new(AssemblyResolver::new(Arc::new(AssemblyCatalog::new()))));
//! let clone = injector.inject_type(&helper, &target)?;
//! assert_eq!(clone.full_name(), "Lib.Helper");
//! assert!(target.find_type("Lib", "Helper").is_some());
//! # Ok::<(), dotgraft::Error>(())
//! ```

pub mod body;
mod clone;
pub mod context;
pub mod importer;
pub mod map;
pub mod mapper;

pub use context::{InjectContext, StagedChanges};
pub use importer::Importer;
pub use map::{InjectedMember, MemberMap};
pub use mapper::{FallbackScope, ImportMapper, Mapping};

use std::sync::Arc;

use rayon::prelude::*;

use crate::{
    metadata::{
        method::MethodDefRc,
        module::ModuleRc,
        references::MethodTarget,
        typedef::TypeDefRc,
    },
    resolver::AssemblyResolver,
    Result,
};

/// Entry point for injection operations.
#[derive(Debug, Clone)]
pub struct Injector {
    resolver: Arc<AssemblyResolver>,
}

impl Injector {
    /// Creates an injector backed by `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<AssemblyResolver>) -> Self {
        Injector { resolver }
    }

    /// The resolver used for cross-runtime re-anchoring.
    #[must_use]
    pub fn resolver(&self) -> &Arc<AssemblyResolver> {
        &self.resolver
    }

    /// A fresh operation cloning from `origin` into `target`.
    ///
    /// Use this to run several injections as one unit and commit them together.
    #[must_use]
    pub fn context(&self, origin: Option<ModuleRc>, target: &ModuleRc) -> InjectContext {
        InjectContext::new(self.resolver.clone(), origin, target.clone())
    }

    /// Clones `source` with all nested types, methods and fields into `target` and adds
    /// the clone as a top-level type of `target`.
    ///
    /// # Errors
    /// Returns [`crate::Error::ImportFailure`] if a reference cannot be anchored in
    /// `target`; in that case `target` is left untouched.
    pub fn inject_type(&self, source: &TypeDefRc, target: &ModuleRc) -> Result<TypeDefRc> {
        let mut ctx = self.context(source.module(), target);
        let clone = ctx.inject_type(source)?;
        ctx.commit();
        Ok(clone)
    }

    /// Clones the members of `source` into `existing`, a type already owned by `target`.
    ///
    /// Returns every definition created, `existing` excluded.
    ///
    /// # Errors
    /// See [`inject_type`](Self::inject_type).
    pub fn inject_members(
        &self,
        source: &TypeDefRc,
        existing: &TypeDefRc,
        target: &ModuleRc,
    ) -> Result<Vec<InjectedMember>> {
        let mut ctx = self.context(source.module(), target);
        let members = ctx.inject_members(source, existing)?;
        ctx.commit();
        Ok(members)
    }

    /// Clones a single method for use in `target`.
    ///
    /// The clone is not attached to any type; references it needs are registered in
    /// `target`.
    ///
    /// # Errors
    /// See [`inject_type`](Self::inject_type).
    pub fn inject_method(&self, source: &MethodDefRc, target: &ModuleRc) -> Result<MethodDefRc> {
        let mut ctx = self.context(source.module(), target);
        let clone = ctx.inject_method(source)?;
        ctx.commit();
        Ok(clone)
    }

    /// Imports a method reference into `target` without cloning anything.
    ///
    /// There is no origin module, so any foreign reference counts as crossing base
    /// libraries when `target` declares one.
    ///
    /// # Errors
    /// Returns [`crate::Error::ImportFailure`] if the method cannot be anchored in `target`.
    pub fn import_method_reference(
        &self,
        target: &ModuleRc,
        method: &MethodTarget,
    ) -> Result<MethodTarget> {
        let mut ctx = self.context(None, target);
        let imported = ctx.import_method(method)?;
        ctx.commit();
        Ok(imported)
    }

    /// Injects `source` into every module of `targets`, one independent operation each.
    ///
    /// Results are in the order of `targets`.
    pub fn inject_type_into_all(
        &self,
        source: &TypeDefRc,
        targets: &[ModuleRc],
    ) -> Vec<Result<TypeDefRc>> {
        targets
            .par_iter()
            .map(|target| self.inject_type(source, target))
            .collect()
    }
}
