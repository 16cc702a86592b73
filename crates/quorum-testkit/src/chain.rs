//! Scripted chain reads

use async_trait::async_trait;
use quorum_core::effects::{ChainEffects, RitualParticipant};
use quorum_core::protocol::PublicKey;
use quorum_core::types::ChainId;
use quorum_core::{QuorumError, Result, RitualId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
struct MockRitual {
    participants: Vec<RitualParticipant>,
    public_key: PublicKey,
}

/// Chain with a fixed head and registered rituals
#[derive(Debug)]
pub struct MockChain {
    chain_id: ChainId,
    block_number: u64,
    rituals: HashMap<RitualId, MockRitual>,
    participant_lookups: AtomicUsize,
    block_lookups: AtomicUsize,
}

impl MockChain {
    /// Chain at block 1000 with no rituals
    pub fn new(chain_id: ChainId) -> Self {
        Self {
            chain_id,
            block_number: 1000,
            rituals: HashMap::new(),
            participant_lookups: AtomicUsize::new(0),
            block_lookups: AtomicUsize::new(0),
        }
    }

    /// Register a ritual
    pub fn with_ritual(
        mut self,
        ritual_id: RitualId,
        participants: Vec<RitualParticipant>,
        public_key: PublicKey,
    ) -> Self {
        self.rituals.insert(
            ritual_id,
            MockRitual {
                participants,
                public_key,
            },
        );
        self
    }

    /// Times `ritual_participants` was called
    pub fn participant_lookups(&self) -> usize {
        self.participant_lookups.load(Ordering::SeqCst)
    }

    /// Times `block_number` was called
    pub fn block_lookups(&self) -> usize {
        self.block_lookups.load(Ordering::SeqCst)
    }

    fn ritual(&self, ritual_id: RitualId) -> Result<&MockRitual> {
        self.rituals
            .get(&ritual_id)
            .ok_or_else(|| QuorumError::not_found(format!("ritual {ritual_id}")))
    }
}

#[async_trait]
impl ChainEffects for MockChain {
    async fn chain_id(&self) -> Result<ChainId> {
        Ok(self.chain_id)
    }

    async fn block_number(&self) -> Result<u64> {
        self.block_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.block_number)
    }

    async fn block_hash(&self, block_number: u64) -> Result<String> {
        let hash = blake3::hash(&block_number.to_be_bytes());
        Ok(format!("0x{}", hash.to_hex()))
    }

    async fn ritual_participants(&self, ritual_id: RitualId) -> Result<Vec<RitualParticipant>> {
        self.participant_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.ritual(ritual_id)?.participants.clone())
    }

    async fn ritual_public_key(&self, ritual_id: RitualId) -> Result<PublicKey> {
        Ok(self.ritual(ritual_id)?.public_key.clone())
    }
}
