//! Relay interface
//!
//! The relay fans a batched request out to individual participants. The
//! requester never contacts participants directly.

use crate::errors::Result;
use crate::protocol::{
    Context, EncryptedThresholdDecryptionRequest, EncryptedThresholdDecryptionResponse,
    PublicKey, RetrievalKit, RetrievalOutcome, TreasureMap,
};
use crate::types::{Address, RitualId};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Batched fragment retrieval for one policy
#[derive(Debug, Clone)]
pub struct RetrieveCfragsRequest {
    /// Decrypted participant map of the policy
    pub treasure_map: TreasureMap,
    /// One kit per ciphertext unit
    pub retrieval_kits: Vec<RetrievalKit>,
    /// Publisher's verifying key
    pub publisher_verifying_key: PublicKey,
    /// Recipient's encrypting key
    pub recipient_encrypting_key: PublicKey,
    /// Recipient's verifying key
    pub recipient_verifying_key: PublicKey,
    /// Resolved condition context, if any kit carries conditions
    pub context: Option<Context>,
}

/// Batched decryption-share request for one ritual
#[derive(Debug, Clone)]
pub struct DecryptRequest {
    /// Ritual being queried
    pub ritual_id: RitualId,
    /// Responses needed before the relay may stop waiting
    pub threshold: usize,
    /// One sealed request per participant
    pub encrypted_requests: BTreeMap<Address, EncryptedThresholdDecryptionRequest>,
}

/// Relay answer to a [`DecryptRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptOutcome {
    /// Sealed responses by participant
    pub encrypted_responses: BTreeMap<Address, EncryptedThresholdDecryptionResponse>,
    /// Errors by participant
    pub errors: BTreeMap<Address, String>,
}

/// Relay collaborator
#[async_trait]
pub trait RelayEffects: Send + Sync {
    /// Ask participants for re-encryption fragments.
    ///
    /// The i-th outcome answers the i-th retrieval kit.
    async fn retrieve_cfrags(&self, request: RetrieveCfragsRequest) -> Result<Vec<RetrievalOutcome>>;

    /// Ask participants for decryption shares
    async fn decrypt(&self, request: DecryptRequest) -> Result<DecryptOutcome>;
}

