//! Strong-name identities and public key token derivation.
//!
//! An assembly's strong name is carried either as the full public key or as the 8-byte
//! public key token derived from it (ECMA-335 §II.6.2.1.3). Comparing identities that use
//! different representations requires reducing both to tokens first, which is what
//! [`Identity::to_token`] does.

use md5::{Digest, Md5};
use sha1::Sha1;

use crate::Result;

/// Hash algorithm identifiers used for token derivation (ECMA-335 §II.23.1.1).
#[allow(non_snake_case)]
pub mod AssemblyHashAlgorithm {
    /// No hash algorithm.
    pub const NONE: u32 = 0x0000;
    /// MD5.
    pub const MD5: u32 = 0x8003;
    /// SHA1, the algorithm the runtime uses for public key tokens.
    pub const SHA1: u32 = 0x8004;
}

/// The strong-name part of an assembly identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Full public key blob.
    PubKey(Vec<u8>),
    /// 8-byte public key token, read little-endian.
    Token(u64),
}

impl Identity {
    /// Builds an identity from raw bytes, either a full key or an 8-byte token.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `is_pub` is false and fewer than 8 bytes are given.
    pub fn from(data: &[u8], is_pub: bool) -> Result<Self> {
        if is_pub {
            return Ok(Identity::PubKey(data.to_vec()));
        }

        Ok(Identity::Token(read_token(data)?))
    }

    /// Reduces this identity to its public key token.
    ///
    /// Tokens are the last 8 bytes of the key hash, interpreted little-endian.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for hash algorithms other than MD5 and SHA1.
    pub fn to_token(&self, algo: u32) -> Result<u64> {
        match self {
            Identity::PubKey(data) => match algo {
                AssemblyHashAlgorithm::MD5 => {
                    let mut hasher = Md5::new();
                    hasher.update(data);
                    let result = hasher.finalize();
                    read_token(&result[result.len() - 8..])
                }
                AssemblyHashAlgorithm::SHA1 => {
                    let mut hasher = Sha1::new();
                    hasher.update(data);
                    let result = hasher.finalize();
                    read_token(&result[result.len() - 8..])
                }
                _ => Err(malformed_error!(
                    "Unsupported hash algorithm for key tokens: 0x{:04X}",
                    algo
                )),
            },
            Identity::Token(token) => Ok(*token),
        }
    }

    /// The SHA1 public key token, or `None` if it cannot be derived.
    #[must_use]
    pub fn token(&self) -> Option<u64> {
        self.to_token(AssemblyHashAlgorithm::SHA1).ok()
    }
}

fn read_token(data: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = data
        .get(..8)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| malformed_error!("Public key token needs 8 bytes, got {}", data.len()))?;
    Ok(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_from_token_bytes() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
        let identity = Identity::from(&data, false).unwrap();
        assert_eq!(identity, Identity::Token(0xF0DE_BC9A_7856_3412));
    }

    #[test]
    fn test_identity_from_short_token() {
        assert!(Identity::from(&[1, 2, 3], false).is_err());
    }

    #[test]
    fn test_pubkey_token_is_sha1_tail() {
        let key: Vec<u8> = (0..160).map(|i| (i % 251) as u8).collect();
        let identity = Identity::PubKey(key.clone());

        let mut hasher = Sha1::new();
        hasher.update(&key);
        let digest = hasher.finalize();
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&digest[digest.len() - 8..]);

        assert_eq!(identity.token(), Some(u64::from_le_bytes(tail)));
    }

    #[test]
    fn test_md5_and_sha1_tokens_differ() {
        let identity = Identity::PubKey(vec![7; 32]);
        let md5 = identity.to_token(AssemblyHashAlgorithm::MD5).unwrap();
        let sha1 = identity.to_token(AssemblyHashAlgorithm::SHA1).unwrap();
        assert_ne!(md5, sha1);
    }

    #[test]
    fn test_token_identity_ignores_algorithm() {
        let identity = Identity::Token(0x1234);
        assert_eq!(identity.to_token(AssemblyHashAlgorithm::NONE).unwrap(), 0x1234);
        assert_eq!(identity.to_token(AssemblyHashAlgorithm::MD5).unwrap(), 0x1234);
    }

    #[test]
    fn test_unsupported_algorithm() {
        let identity = Identity::PubKey(vec![1, 2, 3]);
        assert!(identity.to_token(0x9999).is_err());
    }
}
