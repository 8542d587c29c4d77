//! In-memory metadata model for .NET modules.
//!
//! The model is the graph the resolver and the injection engine work on. It is built
//! in memory (by a loader outside this crate, or by hand in tests) and never serialized
//! here; every structure stays a valid ECMA-335 metadata shape so a writer can emit it.
//!
//! # Key Components
//!
//! - [`assembly`] / [`module`] - assemblies, modules and their type lists
//! - [`typedef`], [`method`], [`field`] - definitions owned by a module
//! - [`references`] - cross-module reference rows and operand sum types
//! - [`reftable`] - token-ordered reference space of a module
//! - [`signatures`] - type and method signatures
//! - [`comparer`] - structural equality over references and signatures
//! - [`identity`] - assembly identities, versions and strong names
//! - [`token`] - metadata table row references
//!
//! # Examples
//!
//! ```rust
//! use dotgraft::metadata::{
//!     module::Module,
//!     typedef::{TypeAttributes, TypeDef},
//! };
//!
//! let module = Module::new("App.dll").into_rc();
//! module.add_type(TypeDef::new("App", "Program", TypeAttributes::PUBLIC).into_rc());
//! assert!(module.find_type("App", "Program").is_some());
//! ```

/// Implementation of loaded assemblies and their flags
pub mod assembly;
/// Structural comparison of references and signatures
pub mod comparer;
/// Implementation of field definitions
pub mod field;
/// Implementation of assembly identities and strong names
pub mod identity;
/// Implementation of method definitions and bodies
pub mod method;
/// Implementation of modules
pub mod module;
/// Implementation of reference rows (assembly, module, type and member references)
pub mod references;
/// Token-ordered reference space of a module
pub mod reftable;
/// Implementation of method and type signatures
pub mod signatures;
/// Commonly used metadata token type
pub mod token;
/// Implementation of type definitions
pub mod typedef;
