//! Ciphertext production
//!
//! Conditions travel with the ciphertext. For ritual ciphertexts the
//! serialized conditions are also the associated data, so a ciphertext cannot
//! be replayed under different conditions.

use crate::kits::{MessageKit, ThresholdMessageKit};
use quorum_conditions::ConditionExpression;
use quorum_core::effects::{ChainEffects, ReencryptionScheme, ThresholdScheme};
use quorum_core::protocol::{AccessControlPolicy, CiphertextHeader, PublicKey};
use quorum_core::{Result, RitualId};
use sha2::{Digest, Sha256};

/// Encrypt under a re-encryption policy key
pub fn encrypt_for_policy(
    scheme: &dyn ReencryptionScheme,
    policy_encrypting_key: &PublicKey,
    plaintext: &[u8],
    conditions: Option<ConditionExpression>,
) -> Result<MessageKit> {
    if let Some(expression) = &conditions {
        expression.to_obj()?;
    }
    let (capsule, ciphertext) = scheme.encrypt(policy_encrypting_key, plaintext)?;
    Ok(MessageKit {
        capsule,
        ciphertext,
        conditions,
    })
}

/// Encrypt under the DKG public key of `ritual_id`
pub async fn encrypt_for_ritual(
    chain: &dyn ChainEffects,
    scheme: &dyn ThresholdScheme,
    ritual_id: RitualId,
    plaintext: &[u8],
    conditions: ConditionExpression,
) -> Result<ThresholdMessageKit> {
    let serialized = conditions.to_conditions()?;
    let dkg_public_key = chain.ritual_public_key(ritual_id).await?;
    let ciphertext = scheme.encrypt(&dkg_public_key, plaintext, serialized.as_bytes())?;
    let authorization = authorize(&ciphertext.header, serialized.as_bytes());
    tracing::debug!(ritual_id = %ritual_id, "encrypted for ritual");

    Ok(ThresholdMessageKit {
        ciphertext,
        acp: AccessControlPolicy {
            conditions: Some(serialized),
            authorization,
        },
    })
}

/// Digest binding a ciphertext header to its associated data
fn authorize(header: &CiphertextHeader, aad: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(header.as_bytes());
    hasher.update(aad);
    hasher.finalize().to_vec()
}
