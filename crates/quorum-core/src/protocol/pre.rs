//! Proxy re-encryption wire objects

use super::keys::PublicKey;
use super::lingo::Conditions;
use crate::errors::Result;
use crate::serialization::{self, base64_bytes};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Re-encryption-addressable header of a ciphertext
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capsule(#[serde(with = "base64_bytes")] Vec<u8>);

impl Capsule {
    /// Wrap capsule bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Unverified re-encryption fragment as returned by a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapsuleFrag(#[serde(with = "base64_bytes")] Vec<u8>);

impl CapsuleFrag {
    /// Wrap fragment bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Fragment that passed verification against its capsule and keys
///
/// Only a `ReencryptionScheme` implementation should construct this type; the
/// retrieval result never stores anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCapsuleFrag(CapsuleFrag);

impl VerifiedCapsuleFrag {
    /// Mark a fragment as verified. Call only after successful verification.
    pub fn from_verified(cfrag: CapsuleFrag) -> Self {
        Self(cfrag)
    }

    /// Underlying fragment
    pub fn as_cfrag(&self) -> &CapsuleFrag {
        &self.0
    }

    /// Drop the verification marker
    pub fn unverify(self) -> CapsuleFrag {
        self.0
    }
}

/// Key fragment encrypted for one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedKeyFrag(#[serde(with = "base64_bytes")] Vec<u8>);

impl EncryptedKeyFrag {
    /// Wrap encrypted key fragment bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Decrypted participant map of a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasureMap {
    /// Fragments required to decrypt
    pub threshold: u8,
    /// Participant address → key fragment destined for it
    pub destinations: BTreeMap<Address, EncryptedKeyFrag>,
    /// Policy's public encrypting key
    pub policy_encrypting_key: PublicKey,
    /// Publisher's verifying key
    pub publisher_verifying_key: PublicKey,
}

impl TreasureMap {
    /// Participants known to hold a key fragment
    pub fn participants(&self) -> BTreeSet<Address> {
        self.destinations.keys().copied().collect()
    }

    /// Canonical bytes sent to the relay
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialization::to_vec(self)
    }

    /// Decode canonical bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serialization::from_slice(bytes)
    }
}

/// Participant map encrypted for the recipient and signed by the publisher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptedTreasureMap(#[serde(with = "base64_bytes")] Vec<u8>);

impl EncryptedTreasureMap {
    /// Wrap encrypted map bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Minimal per-unit request sent to participants through the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalKit {
    /// Capsule of the ciphertext unit
    pub capsule: Capsule,
    /// Participants to ask for a fragment
    pub queried_addresses: BTreeSet<Address>,
    /// Conditions travelling with the ciphertext
    pub conditions: Option<Conditions>,
}

impl RetrievalKit {
    /// Canonical bytes sent to the relay
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialization::to_vec(self)
    }

    /// Decode canonical bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serialization::from_slice(bytes)
    }
}

/// Raw per-unit relay answer, before verification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// Fragments returned by participants
    pub cfrags: BTreeMap<Address, CapsuleFrag>,
    /// Errors reported by participants
    pub errors: BTreeMap<Address, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieval_kit_bytes_are_stable() {
        let kit = RetrievalKit {
            capsule: Capsule::from_bytes(vec![7u8; 16]),
            queried_addresses: [Address::new([2; 20]), Address::new([1; 20])]
                .into_iter()
                .collect(),
            conditions: Some(Conditions::new(r#"{"version":"1.0.0"}"#)),
        };
        let bytes = kit.to_bytes().unwrap();
        assert_eq!(bytes, kit.clone().to_bytes().unwrap());
        assert_eq!(RetrievalKit::from_bytes(&bytes).unwrap(), kit);
    }

    #[test]
    fn test_treasure_map_participants() {
        let mut destinations = BTreeMap::new();
        destinations.insert(Address::new([3; 20]), EncryptedKeyFrag::from_bytes(vec![1]));
        destinations.insert(Address::new([4; 20]), EncryptedKeyFrag::from_bytes(vec![2]));
        let map = TreasureMap {
            threshold: 1,
            destinations,
            policy_encrypting_key: PublicKey::from_bytes(vec![9; 32]),
            publisher_verifying_key: PublicKey::from_bytes(vec![8; 32]),
        };
        assert_eq!(map.participants().len(), 2);
        assert_eq!(TreasureMap::from_bytes(&map.to_bytes().unwrap()).unwrap(), map);
    }
}
