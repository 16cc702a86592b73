//! Address, chain and ritual identifiers
//!
//! Participants (staking providers) and wallets share the same 20-byte address
//! space. Addresses parse case-insensitively and always render lowercase, so
//! checksummed input from the relay compares equal to locally built values.

use crate::errors::{QuorumError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 20]);

/// Participants are identified by their staking provider address
pub type ParticipantId = Address;

impl Address {
    /// Byte length of an address
    pub const LENGTH: usize = 20;

    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex form
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Whether a string is a well-formed `0x`-prefixed address
    pub fn is_valid(value: &str) -> bool {
        value.parse::<Self>().is_ok() && value.starts_with("0x")
    }
}

impl FromStr for Address {
    type Err = QuorumError;

    fn from_str(value: &str) -> Result<Self> {
        let stripped = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        let bytes = hex::decode(stripped)
            .map_err(|e| QuorumError::invalid(format!("Invalid address {value}: {e}")))?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| {
            QuorumError::invalid(format!(
                "Invalid address {value}: expected {} bytes",
                Self::LENGTH
            ))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// EVM chain identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Ethereum mainnet
    pub const ETHEREUM: ChainId = ChainId(1);
    /// Polygon mainnet
    pub const POLYGON: ChainId = ChainId(137);
    /// Polygon Amoy testnet
    pub const AMOY: ChainId = ChainId(80002);
    /// Ethereum Sepolia testnet
    pub const SEPOLIA: ChainId = ChainId(11155111);

    /// Chains on which conditions may be evaluated
    pub const SUPPORTED: [ChainId; 4] = [
        ChainId::ETHEREUM,
        ChainId::POLYGON,
        ChainId::AMOY,
        ChainId::SEPOLIA,
    ];

    /// Whether conditions may target this chain
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// DKG ritual identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RitualId(pub u32);

impl fmt::Display for RitualId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parses_checksummed_input() {
        let checksummed: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        let lowercase: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(checksummed, lowercase);
        assert_eq!(
            checksummed.to_string(),
            "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
        );
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!(!Address::is_valid("0x1234"));
        assert!(!Address::is_valid("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
    }

    #[test]
    fn test_address_serde_as_string() {
        let address = Address::new([0xab; 20]);
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{}\"", address.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_supported_chains() {
        assert!(ChainId(137).is_supported());
        assert!(!ChainId(5).is_supported());
    }
}
