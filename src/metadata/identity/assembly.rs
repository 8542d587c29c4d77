//! Assembly identities, versions and binding comparisons.
//!
//! .NET assemblies are identified by the combination of a simple name, a four-part
//! version, an optional culture and an optional strong name (ECMA-335 §II.6.1). The
//! resolver compares identities in two ways:
//!
//! - [`AssemblyIdentity::matches_exactly`] - every component must agree, strong names are
//!   compared by public key token so a full key matches its own token
//! - [`AssemblyIdentity::matches_loosely`] - only the simple name and, when both sides
//!   carry one, the key token have to agree; the version decides between candidates via
//!   [`AssemblyVersion::is_closer_to`]
//!
//! # Examples
//!
//! ```rust,ignore
//! use dotgraft::metadata::identity::AssemblyIdentity;
//!
//! let mscorlib = AssemblyIdentity::parse(
//!     "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
//! )?;
//! assert_eq!(mscorlib.version.major, 4);
//! # Ok::<(), dotgraft::Error>(())
//! ```

use std::{fmt, fmt::Write as _, str::FromStr};

use crate::{metadata::identity::cryptographic::Identity, Error, Result};

/// Complete identity of an assembly.
#[derive(Debug, Clone)]
pub struct AssemblyIdentity {
    /// Simple name, without extension.
    pub name: String,
    /// Four-part version.
    pub version: AssemblyVersion,
    /// Culture, `None` for culture-neutral assemblies.
    pub culture: Option<String>,
    /// Strong name as full key or token.
    pub strong_name: Option<Identity>,
    /// Target processor architecture, if the identity states one.
    pub processor_architecture: Option<ProcessorArchitecture>,
}

impl PartialEq for AssemblyIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.culture == other.culture
            && self.processor_architecture == other.processor_architecture
    }
}

impl Eq for AssemblyIdentity {}

impl std::hash::Hash for AssemblyIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.culture.hash(state);
        self.processor_architecture.hash(state);
    }
}

/// Four-part assembly version (major.minor.build.revision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssemblyVersion {
    /// Major component.
    pub major: u16,
    /// Minor component.
    pub minor: u16,
    /// Build component.
    pub build: u16,
    /// Revision component.
    pub revision: u16,
}

/// Processor architecture an assembly targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessorArchitecture {
    /// Architecture neutral IL.
    MSIL,
    /// 32-bit Intel.
    X86,
    /// Itanium.
    IA64,
    /// 64-bit AMD/Intel.
    AMD64,
    /// 32-bit ARM.
    ARM,
    /// 64-bit ARM.
    ARM64,
}

impl AssemblyIdentity {
    /// Creates an identity from its components.
    pub fn new(
        name: impl Into<String>,
        version: AssemblyVersion,
        culture: Option<String>,
        strong_name: Option<Identity>,
        processor_architecture: Option<ProcessorArchitecture>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            culture,
            strong_name,
            processor_architecture,
        }
    }

    /// A partial identity carrying only a simple name.
    ///
    /// Used for well-known lookups such as `netstandard`, where any version will do.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, AssemblyVersion::UNKNOWN, None, None, None)
    }

    /// Parses a display name such as `"System.Runtime, Version=4.2.2.0, Culture=neutral,
    /// PublicKeyToken=b03f5f7f11d50a3a"`.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for an empty name, an invalid version or a token that
    /// is not exactly 8 hex-encoded bytes.
    pub fn parse(display_name: &str) -> Result<Self> {
        let mut version = AssemblyVersion::UNKNOWN;
        let mut culture = None;
        let mut strong_name = None;
        let mut processor_architecture = None;

        let mut parts = display_name.split(',').map(str::trim);
        let name = parts.next().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(malformed_error!("Assembly name cannot be empty"));
        }

        for part in parts {
            if let Some(value) = part.strip_prefix("Version=") {
                version = AssemblyVersion::parse(value)?;
            } else if let Some(value) = part.strip_prefix("Culture=") {
                if value != "neutral" {
                    culture = Some(value.to_string());
                }
            } else if let Some(value) = part.strip_prefix("PublicKeyToken=") {
                if value != "null" && !value.is_empty() {
                    let bytes = hex::decode(value).map_err(|e| {
                        malformed_error!("Invalid hex in PublicKeyToken '{}': {}", value, e)
                    })?;
                    if bytes.len() != 8 {
                        return Err(malformed_error!(
                            "PublicKeyToken must be exactly 8 bytes, got {} from '{}'",
                            bytes.len(),
                            value
                        ));
                    }
                    strong_name = Some(Identity::from(&bytes, false)?);
                }
            } else if let Some(value) = part.strip_prefix("ProcessorArchitecture=") {
                processor_architecture = Some(ProcessorArchitecture::parse(value)?);
            }
        }

        Ok(Self {
            name,
            version,
            culture,
            strong_name,
            processor_architecture,
        })
    }

    /// Formats the identity in display-name form.
    #[must_use]
    pub fn display_name(&self) -> String {
        let mut result = String::with_capacity(self.name.len() + 80);
        result.push_str(&self.name);

        let _ = write!(result, ", Version={}", self.version);
        let _ = write!(
            result,
            ", Culture={}",
            self.culture.as_deref().unwrap_or("neutral")
        );

        result.push_str(", PublicKeyToken=");
        match self.public_key_token() {
            Some(token) => result.push_str(&hex::encode(token.to_le_bytes())),
            None => result.push_str("null"),
        }

        if let Some(arch) = &self.processor_architecture {
            let _ = write!(result, ", ProcessorArchitecture={}", arch);
        }

        result
    }

    /// The public key token of the strong name, deriving it from a full key if needed.
    #[must_use]
    pub fn public_key_token(&self) -> Option<u64> {
        self.strong_name.as_ref().and_then(Identity::token)
    }

    /// Returns true if the assembly carries a strong name.
    #[must_use]
    pub fn is_strong_named(&self) -> bool {
        self.strong_name.is_some()
    }

    /// Returns true if the assembly is culture neutral.
    #[must_use]
    pub fn is_culture_neutral(&self) -> bool {
        self.culture.is_none()
    }

    /// Full identity equality: name (case-insensitive), version, culture and key token.
    #[must_use]
    pub fn matches_exactly(&self, other: &AssemblyIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.version == other.version
            && culture_eq(self.culture.as_deref(), other.culture.as_deref())
            && self.public_key_token() == other.public_key_token()
    }

    /// Name equality plus key compatibility, ignoring version and culture.
    ///
    /// Key tokens only have to agree when both identities carry one, so an unsigned
    /// candidate can stand in for a signed request and vice versa.
    #[must_use]
    pub fn matches_loosely(&self, other: &AssemblyIdentity) -> bool {
        if !self.name.eq_ignore_ascii_case(&other.name) {
            return false;
        }

        match (self.public_key_token(), other.public_key_token()) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => true,
        }
    }

    /// Returns true if this assembly can stand in for `required` under the usual binding
    /// rules: same name and culture, same major version and not older.
    #[must_use]
    pub fn satisfies(&self, required: &AssemblyIdentity) -> bool {
        self.name.eq_ignore_ascii_case(&required.name)
            && culture_eq(self.culture.as_deref(), required.culture.as_deref())
            && self.version.is_compatible_with(&required.version)
    }
}

fn culture_eq(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

impl AssemblyVersion {
    /// Version 0.0.0.0, meaning "unspecified".
    pub const UNKNOWN: Self = Self {
        major: 0,
        minor: 0,
        build: 0,
        revision: 0,
    };

    /// Creates a version from its four components.
    #[must_use]
    pub const fn new(major: u16, minor: u16, build: u16, revision: u16) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Returns true for 0.0.0.0.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.major == 0 && self.minor == 0 && self.build == 0 && self.revision == 0
    }

    /// Same major version and not older than `required`. An unknown requirement accepts
    /// any version.
    #[must_use]
    pub fn is_compatible_with(&self, required: &AssemblyVersion) -> bool {
        if required.is_unknown() {
            return true;
        }

        self.major == required.major && *self >= *required
    }

    /// Returns true if `self` is a better pick than `other` for a request of `target`.
    ///
    /// A matching major version wins; among equal majors the higher version wins; among
    /// differing majors the smaller distance wins. An unknown target prefers the highest.
    #[must_use]
    pub fn is_closer_to(&self, other: &AssemblyVersion, target: &AssemblyVersion) -> bool {
        if target.is_unknown() {
            return self > other;
        }

        let self_same_major = self.major == target.major;
        let other_same_major = other.major == target.major;

        match (self_same_major, other_same_major) {
            (true, false) => true,
            (false, true) => false,
            (true, true) => self > other,
            (false, false) => {
                let self_dist = self.major.abs_diff(target.major);
                let other_dist = other.major.abs_diff(target.major);
                self_dist < other_dist || (self_dist == other_dist && self > other)
            }
        }
    }

    /// Parses a dotted version with one to four components.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] if there are too many components or one does not fit a `u16`.
    pub fn parse(version_str: &str) -> Result<Self> {
        let parts: Vec<&str> = version_str.split('.').collect();
        if parts.len() > 4 {
            return Err(malformed_error!("Invalid version format: {}", version_str));
        }

        let mut components = [0u16; 4];
        for (i, part) in parts.iter().enumerate() {
            components[i] = part
                .parse::<u16>()
                .map_err(|_| malformed_error!("Invalid version component: {}", part))?;
        }

        Ok(Self::new(
            components[0],
            components[1],
            components[2],
            components[3],
        ))
    }
}

impl ProcessorArchitecture {
    /// Parses the display-name spelling of an architecture.
    ///
    /// # Errors
    /// Returns [`Error::Malformed`] for unknown architectures.
    pub fn parse(arch_str: &str) -> Result<Self> {
        match arch_str.trim().to_lowercase().as_str() {
            "msil" => Ok(Self::MSIL),
            "x86" => Ok(Self::X86),
            "ia64" => Ok(Self::IA64),
            "amd64" | "x64" => Ok(Self::AMD64),
            "arm" => Ok(Self::ARM),
            "arm64" => Ok(Self::ARM64),
            _ => Err(malformed_error!(
                "Unknown processor architecture: '{}'",
                arch_str.trim()
            )),
        }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

impl fmt::Display for ProcessorArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arch_str = match self {
            Self::MSIL => "MSIL",
            Self::X86 => "x86",
            Self::IA64 => "IA64",
            Self::AMD64 => "AMD64",
            Self::ARM => "ARM",
            Self::ARM64 => "ARM64",
        };
        f.write_str(arch_str)
    }
}

impl fmt::Display for AssemblyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for AssemblyVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl FromStr for AssemblyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_display_name() {
        let identity = AssemblyIdentity::parse(
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
        )
        .unwrap();

        assert_eq!(identity.name, "mscorlib");
        assert_eq!(identity.version, AssemblyVersion::new(4, 0, 0, 0));
        assert!(identity.is_culture_neutral());
        assert!(identity.is_strong_named());
        assert_eq!(
            identity.display_name(),
            "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089"
        );
    }

    #[test]
    fn test_parse_rejects_bad_token() {
        assert!(AssemblyIdentity::parse("a, PublicKeyToken=b77a").is_err());
        assert!(AssemblyIdentity::parse("a, PublicKeyToken=zz7a5c561934e089").is_err());
        assert!(AssemblyIdentity::parse(", Version=1.0").is_err());
    }

    #[test]
    fn test_version_parse() {
        assert_eq!(
            AssemblyVersion::parse("1.2").unwrap(),
            AssemblyVersion::new(1, 2, 0, 0)
        );
        assert!(AssemblyVersion::parse("1.2.3.4.5").is_err());
        assert!(AssemblyVersion::parse("1.2.99999").is_err());
        assert!(AssemblyVersion::parse("").is_err());
    }

    #[test]
    fn test_exact_match_compares_key_tokens() {
        let key = Identity::PubKey(vec![0x42; 160]);
        let token = Identity::Token(key.token().unwrap());
        let version = AssemblyVersion::new(1, 0, 0, 0);

        let with_key = AssemblyIdentity::new("Lib", version, None, Some(key), None);
        let with_token = AssemblyIdentity::new("lib", version, None, Some(token), None);
        let unsigned = AssemblyIdentity::new("Lib", version, None, None, None);

        assert!(with_key.matches_exactly(&with_token));
        assert!(!with_key.matches_exactly(&unsigned));
    }

    #[test]
    fn test_exact_match_requires_version_and_culture() {
        let base = AssemblyIdentity::parse("Lib, Version=1.0.0.0").unwrap();
        let newer = AssemblyIdentity::parse("Lib, Version=1.0.0.1").unwrap();
        let german = AssemblyIdentity::parse("Lib, Version=1.0.0.0, Culture=de-DE").unwrap();

        assert!(!base.matches_exactly(&newer));
        assert!(!base.matches_exactly(&german));
    }

    #[test]
    fn test_loose_match() {
        let request = AssemblyIdentity::named("netstandard");
        let candidate = AssemblyIdentity::parse(
            "netstandard, Version=2.0.0.0, Culture=neutral, PublicKeyToken=cc7b13ffcd2ddd51",
        )
        .unwrap();
        let other_key = AssemblyIdentity::parse(
            "netstandard, Version=2.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
        )
        .unwrap();

        assert!(candidate.matches_loosely(&request));
        assert!(!candidate.matches_loosely(&other_key));
    }

    #[test]
    fn test_is_closer_to() {
        let target = AssemblyVersion::new(4, 0, 0, 0);
        let v4_2 = AssemblyVersion::new(4, 2, 0, 0);
        let v4_1 = AssemblyVersion::new(4, 1, 0, 0);
        let v5 = AssemblyVersion::new(5, 0, 0, 0);
        let v2 = AssemblyVersion::new(2, 0, 0, 0);

        assert!(v4_2.is_closer_to(&v4_1, &target));
        assert!(v4_1.is_closer_to(&v5, &target));
        assert!(v5.is_closer_to(&v2, &target));
        assert!(v5.is_closer_to(&v4_2, &AssemblyVersion::UNKNOWN));
    }

    #[test]
    fn test_satisfies() {
        let installed = AssemblyIdentity::parse("Lib, Version=2.1.0.0").unwrap();
        assert!(installed.satisfies(&AssemblyIdentity::parse("lib, Version=2.0.0.0").unwrap()));
        assert!(!installed.satisfies(&AssemblyIdentity::parse("Lib, Version=3.0.0.0").unwrap()));
        assert!(installed.satisfies(&AssemblyIdentity::named("Lib")));
    }
}
