//! Ritual participant directory
//!
//! Participant sets are immutable once a ritual is fetched, so the directory
//! caches each set for the life of the process.

use async_lock::RwLock;
use quorum_core::effects::{ChainEffects, RitualParticipant};
use quorum_core::{QuorumError, Result, RitualId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Cached view of ritual participant sets
pub struct RitualDirectory {
    chain: Arc<dyn ChainEffects>,
    cache: RwLock<HashMap<RitualId, Arc<Vec<RitualParticipant>>>>,
}

impl RitualDirectory {
    /// Directory reading from `chain`
    pub fn new(chain: Arc<dyn ChainEffects>) -> Self {
        Self {
            chain,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Ordered participant set of a ritual
    pub async fn participants(&self, ritual_id: RitualId) -> Result<Arc<Vec<RitualParticipant>>> {
        if let Some(participants) = self.cache.read().await.get(&ritual_id) {
            return Ok(participants.clone());
        }

        let fetched = self.chain.ritual_participants(ritual_id).await?;
        if fetched.is_empty() {
            return Err(QuorumError::not_found(format!(
                "Ritual {ritual_id} has no participants"
            )));
        }
        tracing::debug!(ritual_id = %ritual_id, participants = fetched.len(), "fetched ritual participants");

        let mut cache = self.cache.write().await;
        let participants = cache
            .entry(ritual_id)
            .or_insert_with(|| Arc::new(fetched))
            .clone();
        Ok(participants)
    }
}

impl fmt::Debug for RitualDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RitualDirectory").finish_non_exhaustive()
    }
}
