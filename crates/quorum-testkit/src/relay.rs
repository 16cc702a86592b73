//! Relay that simulates network participants in-process
//!
//! Each participant follows a scripted [`ParticipantBehavior`]. Honest
//! participants answer exactly as a real node would: fragment requests are
//! answered with toy fragments, and decryption requests are opened with the
//! participant's session secret, answered with a toy share and sealed back.

use crate::schemes::{corrupt, ToyDkg, ToyPre};
use async_lock::Mutex;
use async_trait::async_trait;
use quorum_core::crypto::SessionStaticSecret;
use quorum_core::effects::{DecryptOutcome, DecryptRequest, RelayEffects, RetrieveCfragsRequest};
use quorum_core::protocol::{
    CapsuleFrag, Context, DecryptionShare, EncryptedThresholdDecryptionRequest,
    EncryptedThresholdDecryptionResponse, RetrievalOutcome, ThresholdDecryptionResponse,
};
use quorum_core::{Address, QuorumError, Result, RitualId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted participant behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantBehavior {
    /// Answer correctly
    Honest,
    /// Report an error string instead of answering
    Error(String),
    /// Return a fragment or share that fails verification
    Invalid,
    /// Answer a decryption request for another ritual
    WrongRitual(RitualId),
    /// Never answer
    Silent,
}

/// Relay request as observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    /// A fragment retrieval with its kit count and context
    RetrieveCfrags {
        /// Number of retrieval kits in the batch
        kits: usize,
        /// Context sent with the batch
        context: Option<Context>,
    },
    /// A decryption-share request with its ritual and participant count
    Decrypt {
        /// Ritual queried
        ritual_id: RitualId,
        /// Number of sealed requests
        participants: usize,
        /// Contexts found inside the sealed requests
        contexts: Vec<Option<Context>>,
    },
}

/// In-process relay
#[derive(Default)]
pub struct MockRelay {
    behaviors: HashMap<Address, ParticipantBehavior>,
    session_secrets: HashMap<Address, SessionStaticSecret>,
    dropped_outcomes: usize,
    calls: Mutex<Vec<RecordedCall>>,
    call_count: AtomicUsize,
}

impl MockRelay {
    /// Relay where every participant is honest
    pub fn new() -> Self {
        Self::default()
    }

    /// Script one participant
    pub fn with_behavior(mut self, participant: Address, behavior: ParticipantBehavior) -> Self {
        self.behaviors.insert(participant, behavior);
        self
    }

    /// Give a participant the session secret matching its published key
    pub fn with_session_secret(mut self, participant: Address, secret: SessionStaticSecret) -> Self {
        self.session_secrets.insert(participant, secret);
        self
    }

    /// Drop the last `count` outcomes of every fragment batch
    pub fn dropping_outcomes(mut self, count: usize) -> Self {
        self.dropped_outcomes = count;
        self
    }

    /// Number of relay calls made
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every call observed so far
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    fn behavior(&self, participant: &Address) -> ParticipantBehavior {
        self.behaviors
            .get(participant)
            .cloned()
            .unwrap_or(ParticipantBehavior::Honest)
    }

    async fn record(&self, call: RecordedCall) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().await.push(call);
    }

    fn answer_decrypt(
        &self,
        participant: &Address,
        behavior: &ParticipantBehavior,
        request: &EncryptedThresholdDecryptionRequest,
        contexts: &mut Vec<Option<Context>>,
    ) -> Result<EncryptedThresholdDecryptionResponse> {
        let secret = self
            .session_secrets
            .get(participant)
            .ok_or_else(|| QuorumError::not_found(format!("no session key for {participant}")))?;
        let shared = secret.derive_shared_secret(&request.requester_public_key)?;
        let opened = request.decrypt(&shared)?;
        contexts.push(opened.context.clone());

        let share = ToyDkg::decryption_share(participant, &opened.ciphertext_header)?;
        let (ritual_id, decryption_share) = match behavior {
            ParticipantBehavior::WrongRitual(other) => (*other, share),
            ParticipantBehavior::Invalid => (
                opened.ritual_id,
                DecryptionShare::from_bytes(corrupt(share.as_bytes())),
            ),
            _ => (opened.ritual_id, share),
        };
        ThresholdDecryptionResponse {
            ritual_id,
            decryption_share,
        }
        .encrypt(&shared)
    }
}

#[async_trait]
impl RelayEffects for MockRelay {
    async fn retrieve_cfrags(&self, request: RetrieveCfragsRequest) -> Result<Vec<RetrievalOutcome>> {
        self.record(RecordedCall::RetrieveCfrags {
            kits: request.retrieval_kits.len(),
            context: request.context.clone(),
        })
        .await;

        let map = &request.treasure_map;
        let mut outcomes = Vec::with_capacity(request.retrieval_kits.len());
        for kit in &request.retrieval_kits {
            let mut outcome = RetrievalOutcome::default();
            for participant in &kit.queried_addresses {
                if !map.destinations.contains_key(participant) {
                    continue;
                }
                let cfrag = || {
                    ToyPre::reencrypt(
                        participant,
                        &kit.capsule,
                        &request.publisher_verifying_key,
                        &map.policy_encrypting_key,
                        &request.recipient_encrypting_key,
                    )
                };
                match self.behavior(participant) {
                    ParticipantBehavior::Honest | ParticipantBehavior::WrongRitual(_) => {
                        outcome.cfrags.insert(*participant, cfrag());
                    }
                    ParticipantBehavior::Invalid => {
                        let forged = CapsuleFrag::from_bytes(corrupt(cfrag().as_bytes()));
                        outcome.cfrags.insert(*participant, forged);
                    }
                    ParticipantBehavior::Error(message) => {
                        outcome.errors.insert(*participant, message);
                    }
                    ParticipantBehavior::Silent => {}
                }
            }
            outcomes.push(outcome);
        }
        let keep = outcomes.len().saturating_sub(self.dropped_outcomes);
        outcomes.truncate(keep);
        Ok(outcomes)
    }

    async fn decrypt(&self, request: DecryptRequest) -> Result<DecryptOutcome> {
        let mut outcome = DecryptOutcome::default();
        let mut contexts = Vec::new();
        for (participant, encrypted) in &request.encrypted_requests {
            let behavior = self.behavior(participant);
            match &behavior {
                ParticipantBehavior::Silent => continue,
                ParticipantBehavior::Error(message) => {
                    outcome.errors.insert(*participant, message.clone());
                    continue;
                }
                _ => {}
            }
            match self.answer_decrypt(participant, &behavior, encrypted, &mut contexts) {
                Ok(response) => {
                    outcome.encrypted_responses.insert(*participant, response);
                }
                Err(e) => {
                    outcome.errors.insert(*participant, e.to_string());
                }
            }
        }

        self.record(RecordedCall::Decrypt {
            ritual_id: request.ritual_id,
            participants: request.encrypted_requests.len(),
            contexts,
        })
        .await;
        Ok(outcome)
    }
}
