//! Threshold decryption wire objects
//!
//! A requester sends one `ThresholdDecryptionRequest` per participant, each
//! sealed under the pairwise session secret for that participant. Participants
//! answer with a `ThresholdDecryptionResponse` sealed the same way. The ritual
//! id inside a decrypted response is the authoritative one.

use super::lingo::{Conditions, Context};
use crate::crypto::{SessionSharedSecret, SessionStaticKey};
use crate::errors::Result;
use crate::serialization::{self, base64_bytes};
use crate::types::RitualId;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REQUEST_AAD: &[u8] = b"QUORUM_THRESHOLD_DECRYPTION_REQUEST";
const RESPONSE_AAD: &[u8] = b"QUORUM_THRESHOLD_DECRYPTION_RESPONSE";

/// Decryption-share flavour requested from participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FerveoVariant {
    /// Shares combined with Lagrange coefficients by the requester
    Simple,
    /// Participants pre-apply their coefficient; requires the full threshold set
    Precomputed,
}

/// Public header of a threshold ciphertext
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CiphertextHeader(#[serde(with = "base64_bytes")] Vec<u8>);

impl CiphertextHeader {
    /// Wrap header bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Ciphertext bound to a ritual's DKG public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    /// Header participants compute their share against
    pub header: CiphertextHeader,
    /// Encrypted body
    #[serde(with = "base64_bytes")]
    pub payload: Vec<u8>,
}

/// Access-control metadata bundled with every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlPolicy {
    /// Conditions participants evaluate before releasing a share
    pub conditions: Option<Conditions>,
    /// Encryptor's authorization over the ciphertext header
    #[serde(with = "base64_bytes")]
    pub authorization: Vec<u8>,
}

impl AccessControlPolicy {
    /// Associated data binding the ciphertext to its conditions
    pub fn aad(&self) -> Vec<u8> {
        self.conditions
            .as_ref()
            .map(|c| c.as_bytes().to_vec())
            .unwrap_or_default()
    }
}

/// One participant's contribution toward the shared secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DecryptionShare(#[serde(with = "base64_bytes")] Vec<u8>);

impl DecryptionShare {
    /// Wrap share bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Combined secret able to decrypt one ciphertext
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    /// Wrap combined secret bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Plaintext request for one participant's decryption share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdDecryptionRequest {
    /// Ritual whose key shares should be used
    pub ritual_id: RitualId,
    /// Requested share flavour
    pub variant: FerveoVariant,
    /// Header of the ciphertext to decrypt
    pub ciphertext_header: CiphertextHeader,
    /// Conditions and authorization travelling with the ciphertext
    pub acp: AccessControlPolicy,
    /// Resolved condition context
    pub context: Option<Context>,
}

impl ThresholdDecryptionRequest {
    /// Seal for one participant under the pairwise secret
    pub fn encrypt(
        &self,
        shared_secret: &SessionSharedSecret,
        requester_public_key: SessionStaticKey,
    ) -> Result<EncryptedThresholdDecryptionRequest> {
        let plaintext = serialization::to_vec(self)?;
        let ciphertext = shared_secret.seal(&plaintext, REQUEST_AAD)?;
        Ok(EncryptedThresholdDecryptionRequest {
            ritual_id: self.ritual_id,
            requester_public_key,
            ciphertext,
        })
    }
}

/// Request sealed for one participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedThresholdDecryptionRequest {
    /// Ritual id in clear, for routing
    pub ritual_id: RitualId,
    /// Requester's ephemeral session key
    pub requester_public_key: SessionStaticKey,
    /// Sealed request
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedThresholdDecryptionRequest {
    /// Open on the participant side
    pub fn decrypt(&self, shared_secret: &SessionSharedSecret) -> Result<ThresholdDecryptionRequest> {
        let plaintext = shared_secret.open(&self.ciphertext, REQUEST_AAD)?;
        serialization::from_slice(&plaintext)
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

/// Participant's plaintext answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdDecryptionResponse {
    /// Ritual the share was computed for
    pub ritual_id: RitualId,
    /// The decryption share
    pub decryption_share: DecryptionShare,
}

impl ThresholdDecryptionResponse {
    /// Seal for the requester under the pairwise secret
    pub fn encrypt(
        &self,
        shared_secret: &SessionSharedSecret,
    ) -> Result<EncryptedThresholdDecryptionResponse> {
        let plaintext = serialization::to_vec(self)?;
        Ok(EncryptedThresholdDecryptionResponse {
            ciphertext: shared_secret.seal(&plaintext, RESPONSE_AAD)?,
        })
    }
}

/// Response sealed for the requester
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedThresholdDecryptionResponse {
    /// Sealed response
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedThresholdDecryptionResponse {
    /// Open on the requester side
    pub fn decrypt(
        &self,
        shared_secret: &SessionSharedSecret,
    ) -> Result<ThresholdDecryptionResponse> {
        let plaintext = shared_secret.open(&self.ciphertext, RESPONSE_AAD)?;
        serialization::from_slice(&plaintext)
    }

    /// Canonical bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serialization::to_vec(self)
    }

    /// Decode canonical bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serialization::from_slice(bytes)
    }
}
