//! Ciphertext units and their policy-bound wrappers

use crate::result::RetrievalResult;
use quorum_conditions::ConditionExpression;
use quorum_core::effects::ReencryptionScheme;
use quorum_core::protocol::{
    AccessControlPolicy, Capsule, Ciphertext, PublicKey, RetrievalKit, SecretKey,
};
use quorum_core::serialization::base64_bytes;
use quorum_core::{Address, QuorumError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ciphertext produced under a re-encryption policy key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageKit {
    /// Re-encryption-addressable header
    pub capsule: Capsule,
    /// Encrypted body
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,
    /// Conditions participants evaluate before re-encrypting
    pub conditions: Option<ConditionExpression>,
}

/// A [`MessageKit`] bound to a policy's key and threshold, plus what has
/// been retrieved for it so far
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyMessageKit {
    kit: MessageKit,
    policy_encrypting_key: PublicKey,
    threshold: usize,
    result: RetrievalResult,
}

impl PolicyMessageKit {
    /// Bind a kit to a policy; nothing is retrieved yet
    pub fn from_message_kit(
        kit: MessageKit,
        policy_encrypting_key: PublicKey,
        threshold: usize,
    ) -> Self {
        Self {
            kit,
            policy_encrypting_key,
            threshold,
            result: RetrievalResult::empty(),
        }
    }

    /// Underlying message kit
    pub fn message_kit(&self) -> &MessageKit {
        &self.kit
    }

    /// Fragments required to decrypt
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Everything retrieved so far
    pub fn result(&self) -> &RetrievalResult {
        &self.result
    }

    /// Copy with `result` merged into the accumulated one
    pub fn with_result(&self, result: &RetrievalResult) -> Self {
        Self {
            result: self.result.with_result(result),
            ..self.clone()
        }
    }

    /// Whether enough verified fragments are held
    pub fn is_decryptable(&self) -> bool {
        self.result.verified_count() >= self.threshold
    }

    /// Request for the participants that have not yet contributed
    pub fn as_retrieval_kit(&self, participants: &BTreeSet<Address>) -> Result<RetrievalKit> {
        let queried_addresses = participants
            .iter()
            .filter(|participant| !self.result.cfrags().contains_key(participant))
            .copied()
            .collect();
        let conditions = self
            .kit
            .conditions
            .as_ref()
            .map(ConditionExpression::to_conditions)
            .transpose()?;
        Ok(RetrievalKit {
            capsule: self.kit.capsule.clone(),
            queried_addresses,
            conditions,
        })
    }

    /// Combine the verified fragments and decrypt
    pub fn decrypt(
        &self,
        scheme: &dyn ReencryptionScheme,
        recipient_secret_key: &SecretKey,
    ) -> Result<Vec<u8>> {
        if !self.is_decryptable() {
            return Err(QuorumError::threshold_not_met(
                self.threshold,
                self.result.verified_count(),
                self.result.errors().clone(),
            ));
        }
        scheme.decrypt_reencrypted(
            recipient_secret_key,
            &self.policy_encrypting_key,
            &self.kit.capsule,
            self.result.clone().into_cfrags(),
            &self.kit.ciphertext,
        )
    }
}

/// Ciphertext produced under a ritual's DKG public key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdMessageKit {
    /// Ciphertext header and body
    pub ciphertext: Ciphertext,
    /// Conditions and encryptor authorization sent to participants
    pub acp: AccessControlPolicy,
}

impl ThresholdMessageKit {
    /// Conditions participants evaluate, parsed from the access control policy
    pub fn conditions(&self) -> Result<ConditionExpression> {
        let conditions = self.acp.conditions.as_ref().ok_or_else(|| {
            QuorumError::invalid("Ritual ciphertext carries no conditions")
        })?;
        ConditionExpression::from_conditions(conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::protocol::{CapsuleFrag, VerifiedCapsuleFrag};
    use std::collections::BTreeMap;

    fn node(b: u8) -> Address {
        Address::new([b; 20])
    }

    fn kit() -> PolicyMessageKit {
        PolicyMessageKit::from_message_kit(
            MessageKit {
                capsule: Capsule::from_bytes(vec![2, 9, 9]),
                ciphertext: vec![1, 2, 3],
                conditions: None,
            },
            PublicKey::from_bytes(vec![2; 33]),
            2,
        )
    }

    #[test]
    fn test_retrieval_kit_skips_contributors() {
        let received = RetrievalResult::new(
            [(
                node(1),
                VerifiedCapsuleFrag::from_verified(CapsuleFrag::from_bytes(vec![1])),
            )]
            .into_iter()
            .collect(),
            BTreeMap::new(),
        );
        let kit = kit().with_result(&received);
        let participants: BTreeSet<Address> = [node(1), node(2), node(3)].into_iter().collect();

        let retrieval = kit.as_retrieval_kit(&participants).unwrap();
        assert_eq!(
            retrieval.queried_addresses,
            [node(2), node(3)].into_iter().collect()
        );
        assert!(retrieval.conditions.is_none());
        assert!(!kit.is_decryptable());
    }

    #[test]
    fn test_decrypt_below_threshold_reports_errors() {
        struct Unreachable;
        impl ReencryptionScheme for Unreachable {
            fn encrypt(&self, _: &PublicKey, _: &[u8]) -> Result<(Capsule, Vec<u8>)> {
                unreachable!()
            }
            fn decrypt_treasure_map(
                &self,
                _: &quorum_core::protocol::EncryptedTreasureMap,
                _: &SecretKey,
                _: &PublicKey,
            ) -> Result<quorum_core::protocol::TreasureMap> {
                unreachable!()
            }
            fn verify_cfrag(
                &self,
                _: CapsuleFrag,
                _: &Capsule,
                _: &PublicKey,
                _: &PublicKey,
                _: &PublicKey,
            ) -> Result<VerifiedCapsuleFrag> {
                unreachable!()
            }
            fn decrypt_reencrypted(
                &self,
                _: &SecretKey,
                _: &PublicKey,
                _: &Capsule,
                _: Vec<VerifiedCapsuleFrag>,
                _: &[u8],
            ) -> Result<Vec<u8>> {
                unreachable!()
            }
        }

        let failed = RetrievalResult::new(
            BTreeMap::new(),
            [(node(4), "offline".to_string())].into_iter().collect(),
        );
        let err = kit()
            .with_result(&failed)
            .decrypt(&Unreachable, &SecretKey::from_bytes(vec![0; 32]))
            .unwrap_err();
        match err {
            QuorumError::ThresholdNotMet {
                threshold,
                received,
                errors,
            } => {
                assert_eq!((threshold, received), (2, 0));
                assert_eq!(errors[&node(4)], "offline");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_threshold_kit_conditions_follow_acp() {
        use quorum_conditions::{Comparator, TimeCondition};
        use quorum_core::protocol::CiphertextHeader;
        use quorum_core::types::ChainId;

        let expression =
            ConditionExpression::new(TimeCondition::block_time(ChainId::POLYGON, Comparator::Gt, 0));
        let mut kit = ThresholdMessageKit {
            ciphertext: Ciphertext {
                header: CiphertextHeader::from_bytes(vec![1; 4]),
                payload: vec![2; 4],
            },
            acp: AccessControlPolicy {
                conditions: Some(expression.to_conditions().unwrap()),
                authorization: vec![3; 32],
            },
        };
        assert_eq!(kit.conditions().unwrap(), expression);

        kit.acp.conditions = None;
        assert!(matches!(kit.conditions(), Err(QuorumError::Invalid { .. })));
    }
}
