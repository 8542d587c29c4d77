// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # dotgraft
//!
//! Cross-module type injection and assembly resolution over an in-memory .NET metadata
//! model.
//!
//! `dotgraft` copies types, methods and fields out of one module and into another, the
//! way protection and instrumentation tools graft runtime helpers into a target binary.
//! Every reference the copied code makes is rebound to the destination module, including
//! references that have to move between base libraries: a helper compiled against
//! `mscorlib` can be injected into a module built against `System.Runtime` or
//! `netstandard`, and its `System.Environment` reference ends up pointing wherever the
//! destination runtime actually defines that type.
//!
//! ## Features
//!
//! - **Two-phase cloning** - structure first, signatures and bodies second, so cyclic type
//!   graphs clone without special cases
//! - **Body relinking** - branch targets, switch tables and exception handler regions are
//!   re-pointed at the cloned instructions
//! - **Cross-runtime re-anchoring** - a fixed fallback chain over the destination base
//!   library, `netstandard`, `mscorlib`, the original assembly and `System.Private.CoreLib`
//! - **Two-strategy resolver** - exact identity matching, then best-version fuzzy matching,
//!   each with its own cache
//! - **Facade flattening** - a resolved `netstandard` facade absorbs the types it forwards
//! - **All or nothing** - a failed injection leaves the destination untouched
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dotgraft::prelude::*;
//!
//! let catalog = AssemblyCatalog::new();
//! let resolver = Arc::new(AssemblyResolver::new(Arc::new(catalog)));
//! let injector = Injector::new(resolver);
//!
//! let runtime = Assembly::new(AssemblyIdentity::named("Runtime"), AssemblyFlags::empty());
//! let origin = Module::new("Runtime.dll").into_rc();
//! runtime.add_module(origin.clone());
//! let helper = TypeDef::new("Runtime", "Helper", TypeAttributes::PUBLIC).into_rc();
//! origin.add_type(helper.clone());
//!
//! let app = Assembly::new(AssemblyIdentity::named("App"), AssemblyFlags::empty());
//! let target = Module::new("App.exe").into_rc();
//! app.add_module(target.clone());
//!
//! let injected = injector.inject_type(&helper, &target)?;
//! assert!(Arc::ptr_eq(&target.types()[0], &injected));
//! # Ok::<(), dotgraft::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`metadata`] - the object model: assemblies, modules, definitions, references,
//!   signatures, method bodies and the per-module reference table
//! - [`resolver`] - identity to assembly resolution, search paths, facade flattening
//! - [`inject`] - member map, importer, cross-runtime mapper and the clone engine
//!
//! Reading and writing PE files is out of scope; hosts hand in their own model through an
//! [`resolver::AssemblyLocator`].

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust
/// use dotgraft::prelude::*;
///
/// let module = Module::new("App.exe").into_rc();
/// assert!(module.types().is_empty());
/// ```
pub mod prelude;

/// The in-memory metadata model.
///
/// Definitions own their children and point back at their owners through weak handles;
/// references name foreign entities structurally and are registered per module in a
/// [`metadata::reftable::ReferenceTable`].
pub mod metadata;

/// Assembly resolution with exact and fuzzy strategies.
pub mod resolver;

/// Cross-module injection.
pub mod inject;

/// `dotgraft` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `dotgraft` Error type
///
/// # Examples
///
/// ```rust
/// use dotgraft::Error;
///
/// fn describe(err: &Error) -> String {
///     match err {
///         Error::ImportFailure(name) => format!("cannot rebind {}", name),
///         Error::MissingMapping(what) => format!("dangling {}", what),
///         other => other.to_string(),
///     }
/// }
/// assert_eq!(describe(&Error::ImportFailure("System.Environment".into())), "cannot rebind System.Environment");
/// ```
pub use error::Error;
