//! Chain read interface
//!
//! Block lookups are used only for attestation freshness. Ritual state comes
//! from the coordinator contract.

use crate::crypto::SessionStaticKey;
use crate::errors::Result;
use crate::protocol::PublicKey;
use crate::types::{Address, ChainId, RitualId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Participant record of a DKG ritual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualParticipant {
    /// Staking provider address
    pub provider: Address,
    /// Published session key used to derive request secrets
    pub public_key: SessionStaticKey,
}

/// Read-only chain access
#[async_trait]
pub trait ChainEffects: Send + Sync {
    /// Chain id of the connected network
    async fn chain_id(&self) -> Result<ChainId>;

    /// Latest block number
    async fn block_number(&self) -> Result<u64>;

    /// `0x`-prefixed hash of the given block
    async fn block_hash(&self, block_number: u64) -> Result<String>;

    /// Ordered participant set of a ritual
    async fn ritual_participants(&self, ritual_id: RitualId) -> Result<Vec<RitualParticipant>>;

    /// Aggregated DKG public key of a ritual
    async fn ritual_public_key(&self, ritual_id: RitualId) -> Result<PublicKey>;
}
