//! Assembly identity and strong-name handling.

pub use assembly::{AssemblyIdentity, AssemblyVersion, ProcessorArchitecture};
pub use cryptographic::{AssemblyHashAlgorithm, Identity};

mod assembly;
mod cryptographic;
