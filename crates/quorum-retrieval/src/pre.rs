//! Fragment retrieval for re-encryption policies
//!
//! One round decrypts the policy's participant map, asks the relay for
//! fragments for every ciphertext unit in a single batched call, verifies each
//! returned fragment and folds the outcome into the unit's
//! [`RetrievalResult`]. Unverifiable fragments never count toward the
//! threshold.

use crate::kits::{MessageKit, PolicyMessageKit};
use crate::result::RetrievalResult;
use quorum_conditions::{ConditionContext, ConditionExpression, ContextMap};
use quorum_core::effects::{ReencryptionScheme, RelayEffects, RetrieveCfragsRequest};
use quorum_core::protocol::{
    Context, EncryptedTreasureMap, PublicKey, RetrievalOutcome, SecretKey, TreasureMap,
};
use quorum_core::serialization::to_canonical_json;
use quorum_core::{QuorumError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Error recorded for a participant whose fragment failed verification
pub const FRAGMENT_VERIFICATION_FAILED: &str = "fragment verification failed";

/// Public data of a policy granted to the recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrePolicy {
    /// Policy's public encrypting key
    pub policy_encrypting_key: PublicKey,
    /// Publisher's verifying key
    pub publisher_verifying_key: PublicKey,
    /// Participant map encrypted for the recipient
    pub encrypted_treasure_map: EncryptedTreasureMap,
}

/// Recipient-side fragment retrieval
pub struct PreDecrypter {
    scheme: Arc<dyn ReencryptionScheme>,
    relay: Arc<dyn RelayEffects>,
    recipient_secret_key: SecretKey,
    recipient_encrypting_key: PublicKey,
    recipient_verifying_key: PublicKey,
}

impl PreDecrypter {
    /// Decrypter for one recipient
    pub fn new(
        scheme: Arc<dyn ReencryptionScheme>,
        relay: Arc<dyn RelayEffects>,
        recipient_secret_key: SecretKey,
        recipient_encrypting_key: PublicKey,
        recipient_verifying_key: PublicKey,
    ) -> Self {
        Self {
            scheme,
            relay,
            recipient_secret_key,
            recipient_encrypting_key,
            recipient_verifying_key,
        }
    }

    /// Run one retrieval round for every unit.
    ///
    /// Returns one policy-bound kit per input kit, in order, each carrying
    /// what this round collected. Units are not required to be decryptable.
    pub async fn retrieve(
        &self,
        policy: &PrePolicy,
        kits: &[MessageKit],
        context: Option<&ConditionContext>,
    ) -> Result<Vec<PolicyMessageKit>> {
        let treasure_map = self.scheme.decrypt_treasure_map(
            &policy.encrypted_treasure_map,
            &self.recipient_secret_key,
            &policy.publisher_verifying_key,
        )?;
        self.check_map(policy, &treasure_map)?;

        let threshold = usize::from(treasure_map.threshold);
        let policy_kits: Vec<PolicyMessageKit> = kits
            .iter()
            .map(|kit| {
                PolicyMessageKit::from_message_kit(
                    kit.clone(),
                    policy.policy_encrypting_key.clone(),
                    threshold,
                )
            })
            .collect();

        let context = resolve_context(kits, context).await?;

        let participants = treasure_map.participants();
        let retrieval_kits = policy_kits
            .iter()
            .map(|kit| kit.as_retrieval_kit(&participants))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            units = retrieval_kits.len(),
            participants = participants.len(),
            threshold,
            "requesting fragments"
        );
        let outcomes = self
            .relay
            .retrieve_cfrags(RetrieveCfragsRequest {
                treasure_map: treasure_map.clone(),
                retrieval_kits,
                publisher_verifying_key: policy.publisher_verifying_key.clone(),
                recipient_encrypting_key: self.recipient_encrypting_key.clone(),
                recipient_verifying_key: self.recipient_verifying_key.clone(),
                context,
            })
            .await?;

        if outcomes.len() != policy_kits.len() {
            return Err(QuorumError::network(format!(
                "Relay returned {} outcome(s) for {} retrieval kit(s)",
                outcomes.len(),
                policy_kits.len()
            )));
        }

        let merged: Vec<PolicyMessageKit> = policy_kits
            .iter()
            .zip(outcomes)
            .map(|(kit, outcome)| kit.with_result(&self.verify(policy, kit, outcome)))
            .collect();

        let decryptable = merged.iter().filter(|kit| kit.is_decryptable()).count();
        tracing::info!(
            units = merged.len(),
            decryptable,
            threshold,
            "fragment retrieval round complete"
        );
        Ok(merged)
    }

    /// Retrieve and decrypt every unit; fails if any unit stays below threshold
    pub async fn retrieve_and_decrypt(
        &self,
        policy: &PrePolicy,
        kits: &[MessageKit],
        context: Option<&ConditionContext>,
    ) -> Result<Vec<Vec<u8>>> {
        self.retrieve(policy, kits, context)
            .await?
            .iter()
            .map(|kit| kit.decrypt(self.scheme.as_ref(), &self.recipient_secret_key))
            .collect()
    }

    fn check_map(&self, policy: &PrePolicy, map: &TreasureMap) -> Result<()> {
        if map.policy_encrypting_key != policy.policy_encrypting_key {
            return Err(QuorumError::crypto(
                "Treasure map was issued for a different policy key",
            ));
        }
        if map.threshold == 0 || usize::from(map.threshold) > map.destinations.len() {
            return Err(QuorumError::invalid(format!(
                "Treasure map threshold {} does not fit {} participant(s)",
                map.threshold,
                map.destinations.len()
            )));
        }
        Ok(())
    }

    fn verify(
        &self,
        policy: &PrePolicy,
        kit: &PolicyMessageKit,
        outcome: RetrievalOutcome,
    ) -> RetrievalResult {
        let capsule = &kit.message_kit().capsule;
        let mut errors = outcome.errors;
        let mut verified = BTreeMap::new();

        for (participant, reason) in &errors {
            tracing::warn!(participant = %participant, reason = %reason, "participant reported an error");
        }

        for (participant, cfrag) in outcome.cfrags {
            match self.scheme.verify_cfrag(
                cfrag,
                capsule,
                &policy.publisher_verifying_key,
                &policy.policy_encrypting_key,
                &self.recipient_encrypting_key,
            ) {
                Ok(cfrag) => {
                    tracing::debug!(participant = %participant, "fragment verified");
                    verified.insert(participant, cfrag);
                }
                Err(e) => {
                    tracing::warn!(participant = %participant, error = %e, "dropping unverifiable fragment");
                    errors
                        .entry(participant)
                        .or_insert_with(|| FRAGMENT_VERIFICATION_FAILED.to_string());
                }
            }
        }

        RetrievalResult::new(verified, errors)
    }
}

/// One context covering the conditions of every conditioned unit.
///
/// The caller's context contributes its signer, attestation provider and
/// custom parameters; variables come from each unit's own conditions. Units
/// without conditions need no context.
async fn resolve_context(
    kits: &[MessageKit],
    context: Option<&ConditionContext>,
) -> Result<Option<Context>> {
    let mut expressions: BTreeMap<String, &ConditionExpression> = BTreeMap::new();
    for expression in kits.iter().filter_map(|kit| kit.conditions.as_ref()) {
        expressions.entry(expression.to_json()?).or_insert(expression);
    }

    let Some(context) = context else {
        if expressions.values().any(|expression| expression.requires_signer()) {
            return Err(QuorumError::signer_required(
                "conditions reference :userAddress but no context was provided",
            ));
        }
        let missing: Vec<String> = expressions
            .values()
            .flat_map(|expression| expression.context_variables())
            .map(|variable| variable.as_str().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(QuorumError::missing_parameters(missing));
        }
        return Ok(None);
    };
    if expressions.is_empty() {
        return Ok(None);
    }

    let mut resolved = ContextMap::new();
    for expression in expressions.into_values() {
        resolved.extend(context.for_expression(expression.clone())?.to_obj().await?);
    }
    Ok(Some(Context::new(to_canonical_json(&resolved)?)))
}

impl fmt::Debug for PreDecrypter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreDecrypter")
            .field("recipient_encrypting_key", &self.recipient_encrypting_key)
            .finish_non_exhaustive()
    }
}
