//! Canonical serialization for Quorum wire objects
//!
//! Binary wire objects use DAG-CBOR, which gives a deterministic encoding for
//! anything that travels to the relay. JSON output goes through
//! `serde_json::Value`, whose maps are key-ordered, so the string form of any
//! object is stable and suitable for hashing, signing and persistence.

use crate::errors::{QuorumError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Serialize any serde-compatible type to DAG-CBOR bytes
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_ipld_dagcbor::to_vec(value).map_err(|e| {
        QuorumError::serialization(format!("Failed to serialize to DAG-CBOR: {e}"))
    })
}

/// Deserialize DAG-CBOR bytes to any serde-compatible type
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_ipld_dagcbor::from_slice(bytes)
        .map_err(|e| QuorumError::serialization(format!("Failed to decode DAG-CBOR: {e}")))
}

/// Serialize to a JSON string with sorted object keys
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&value)?)
}

/// Version information for semantic versioning support
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    /// Major version number - increment for incompatible changes
    pub major: u16,
    /// Minor version number - increment for backwards-compatible additions
    pub minor: u16,
    /// Patch version number - increment for backwards-compatible bug fixes
    pub patch: u16,
}

impl SemanticVersion {
    /// Create a new semantic version
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Check if this version is compatible with another
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.major == other.major
    }

    /// Check if this version is newer than another
    pub fn is_newer(&self, other: &Self) -> bool {
        self > other
    }
}

impl FromStr for SemanticVersion {
    type Err = QuorumError;

    fn from_str(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split('.').collect();
        if parts.len() != 3 {
            return Err(QuorumError::invalid(format!(
                "Invalid version {value}: expected MAJOR.MINOR.PATCH"
            )));
        }
        let parse = |part: &str| {
            part.parse::<u16>()
                .map_err(|_| QuorumError::invalid(format!("Invalid version component in {value}")))
        };
        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Serde helpers encoding byte vectors as `0x`-less hex strings
pub mod hex_bytes {
    use super::*;
    use serde::{Deserializer, Serializer};

    /// Serialize bytes as hex
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    /// Deserialize bytes from hex, tolerating a `0x` prefix
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        let stripped = value.strip_prefix("0x").unwrap_or(&value);
        hex::decode(stripped).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers encoding byte vectors as standard base64 strings
pub mod base64_bytes {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserializer, Serializer};

    /// Encode bytes as base64 text
    pub fn encode(bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    /// Decode base64 text
    pub fn decode(value: &str) -> Result<Vec<u8>> {
        STANDARD
            .decode(value)
            .map_err(|e| QuorumError::serialization(format!("Invalid base64: {e}")))
    }

    /// Serialize bytes as base64
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    /// Deserialize bytes from base64
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        decode(&value).map_err(serde::de::Error::custom)
    }
}
