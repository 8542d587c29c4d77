//! Error types for type injection and assembly resolution.
//!
//! Everything fallible in this crate returns [`crate::Result`], whose error side is the
//! [`Error`] enum defined here. Resolution misses are not errors: the resolver answers
//! `None` when an assembly cannot be found and the injection engine decides whether that
//! absence is fatal (it always is for the import fallback chain, see [`Error::ImportFailure`]).
//!
//! # Error Categories
//!
//! - **Import errors**: [`Error::ImportFailure`] when a type reference cannot be rebound to
//!   the destination runtime, [`Error::MissingMapping`] when a cloned body refers to an
//!   instruction or member that was never cloned
//! - **Structural errors**: [`Error::Malformed`] for models that violate their own invariants
//!   (dangling branch targets, out of range argument slots, missing signatures)
//!
//! # Examples
//!
//! ```rust,ignore
//! use dotgraft::{Error, inject::Injector};
//!
//! match injector.inject_type(&source, &target) {
//!     Ok(clone) => println!("injected {}", clone.full_name()),
//!     Err(Error::ImportFailure(name)) => eprintln!("cannot rebind {name}"),
//!     Err(e) => eprintln!("injection failed: {e}"),
//! }
//! ```

use thiserror::Error;

/// Helper macro for creating malformed model errors with source location information.
///
/// Captures the current file and line so that a failing structural check can be traced
/// back to the code that rejected the model.
///
/// # Examples
///
/// ```rust,ignore
/// let error = malformed_error!("Branch target {} is not part of the body", id);
/// ```
macro_rules! malformed_error {
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can
/// potentially return.
#[derive(Error, Debug)]
pub enum Error {
    /// A type reference could not be rebound to any assembly of the destination runtime.
    ///
    /// Raised by the importer when the cross-runtime fallback chain is exhausted. The
    /// payload is the full name of the offending reference.
    #[error("Failed to import type {0} into the destination runtime")]
    ImportFailure(String),

    /// A cloned object referenced something that has no counterpart in the clone.
    ///
    /// Typical causes are branch targets that are not part of the source body or
    /// exception handler boundaries that point outside of it.
    #[error("No mapping for {0}")]
    MissingMapping(String),

    /// The model violates one of its own structural invariants.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
