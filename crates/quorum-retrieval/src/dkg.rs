//! Decryption-share retrieval for DKG rituals
//!
//! Each attempt generates a fresh ephemeral session secret. Every participant
//! gets its own request sealed under the pairwise secret derived from that
//! ephemeral secret and the participant's published session key. The relay
//! receives all sealed requests in one call; below-threshold answers are
//! never combined, and any response for the wrong ritual aborts the attempt.

use crate::directory::RitualDirectory;
use crate::kits::ThresholdMessageKit;
use quorum_conditions::ConditionContext;
use quorum_core::crypto::{SessionSharedSecret, SessionStaticSecret};
use quorum_core::effects::{ChainEffects, DecryptRequest, RelayEffects, ThresholdScheme};
use quorum_core::protocol::{Context, FerveoVariant, ThresholdDecryptionRequest};
use quorum_core::{Address, QuorumError, Result, RitualId};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Requester-side threshold decryption
pub struct ThresholdDecrypter {
    chain: Arc<dyn ChainEffects>,
    relay: Arc<dyn RelayEffects>,
    scheme: Arc<dyn ThresholdScheme>,
    directory: Arc<RitualDirectory>,
    variant: FerveoVariant,
}

impl ThresholdDecrypter {
    /// Decrypter with its own ritual directory and simple shares
    pub fn new(
        chain: Arc<dyn ChainEffects>,
        relay: Arc<dyn RelayEffects>,
        scheme: Arc<dyn ThresholdScheme>,
    ) -> Self {
        Self {
            directory: Arc::new(RitualDirectory::new(chain.clone())),
            chain,
            relay,
            scheme,
            variant: FerveoVariant::Simple,
        }
    }

    /// Share a ritual directory with other decrypters
    pub fn with_directory(mut self, directory: Arc<RitualDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Request a different share flavour
    pub fn with_variant(mut self, variant: FerveoVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Collect `threshold` shares for `kit` from the ritual and decrypt.
    ///
    /// The context is always resolved against the kit's own conditions; a
    /// given `context` contributes its signer, attestation provider and
    /// custom parameters. Without one, only conditions that reference no
    /// parameters can be satisfied.
    pub async fn retrieve_and_decrypt(
        &self,
        ritual_id: RitualId,
        threshold: usize,
        kit: &ThresholdMessageKit,
        context: Option<&ConditionContext>,
    ) -> Result<Vec<u8>> {
        let participants = self.directory.participants(ritual_id).await?;
        if threshold == 0 || threshold > participants.len() {
            return Err(QuorumError::invalid(format!(
                "Threshold {threshold} does not fit ritual {ritual_id} with {} participant(s)",
                participants.len()
            )));
        }

        let context = self.request_context(kit, context).await?;

        let requester = SessionStaticSecret::random();
        let request = ThresholdDecryptionRequest {
            ritual_id,
            variant: self.variant,
            ciphertext_header: kit.ciphertext.header.clone(),
            acp: kit.acp.clone(),
            context: Some(context),
        };

        let mut secrets: BTreeMap<Address, SessionSharedSecret> = BTreeMap::new();
        let mut encrypted_requests = BTreeMap::new();
        for participant in participants.iter() {
            let shared = requester.derive_shared_secret(&participant.public_key)?;
            encrypted_requests.insert(
                participant.provider,
                request.encrypt(&shared, requester.public_key())?,
            );
            secrets.insert(participant.provider, shared);
        }

        tracing::debug!(
            ritual_id = %ritual_id,
            threshold,
            participants = encrypted_requests.len(),
            "requesting decryption shares"
        );
        let outcome = self
            .relay
            .decrypt(DecryptRequest {
                ritual_id,
                threshold,
                encrypted_requests,
            })
            .await?;

        let mut errors = outcome.errors;
        for (participant, reason) in &errors {
            tracing::warn!(participant = %participant, reason = %reason, "participant reported an error");
        }
        if outcome.encrypted_responses.len() < threshold {
            return Err(QuorumError::threshold_not_met(
                threshold,
                outcome.encrypted_responses.len(),
                errors,
            ));
        }

        let mut shares = Vec::with_capacity(outcome.encrypted_responses.len());
        for (participant, encrypted) in &outcome.encrypted_responses {
            let Some(shared) = secrets.get(participant) else {
                tracing::warn!(participant = %participant, "response from a participant outside the ritual");
                errors.insert(*participant, "not a ritual participant".to_string());
                continue;
            };
            let response = match encrypted.decrypt(shared) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(participant = %participant, error = %e, "undecryptable response");
                    errors.insert(*participant, e.to_string());
                    continue;
                }
            };
            if response.ritual_id != ritual_id {
                tracing::warn!(
                    participant = %participant,
                    expected = %ritual_id,
                    received = %response.ritual_id,
                    "response for another ritual"
                );
                return Err(QuorumError::RitualIdMismatch {
                    expected: ritual_id.0,
                    received: response.ritual_id.0,
                });
            }
            tracing::debug!(participant = %participant, "decryption share received");
            shares.push(response.decryption_share);
        }

        if shares.len() < threshold {
            return Err(QuorumError::threshold_not_met(threshold, shares.len(), errors));
        }

        let shared_secret = self.scheme.combine_shares(self.variant, shares)?;
        let plaintext =
            self.scheme
                .decrypt_with_shared_secret(&kit.ciphertext, &kit.acp.aad(), &shared_secret)?;
        tracing::info!(ritual_id = %ritual_id, threshold, "threshold decryption complete");
        Ok(plaintext)
    }

    /// Resolve the context against the conditions participants will evaluate
    async fn request_context(
        &self,
        kit: &ThresholdMessageKit,
        context: Option<&ConditionContext>,
    ) -> Result<Context> {
        let conditions = kit.conditions()?;
        let context = match context {
            Some(context) => context.for_expression(conditions)?,
            None => ConditionContext::builder(conditions, self.chain.clone()).build()?,
        };
        context.to_json().await
    }
}

impl fmt::Debug for ThresholdDecrypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdDecrypter")
            .field("directory", &self.directory)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}
