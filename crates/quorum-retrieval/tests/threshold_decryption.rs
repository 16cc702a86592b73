//! Decryption-share rounds against a simulated ritual

use assert_matches::assert_matches;
use quorum_conditions::{
    Comparator, ConditionContext, ConditionExpression, ContextVariable, RpcCondition,
    TimeCondition,
};
use quorum_core::types::ChainId;
use quorum_core::{Address, QuorumError, RitualId};
use quorum_retrieval::{encrypt_for_ritual, RitualDirectory, ThresholdDecrypter, ThresholdMessageKit};
use quorum_testkit::{
    init_test_tracing, participant, DkgRitualFixture, MockChain, MockRelay, MockSigner,
    ParticipantBehavior, RecordedCall, ToyDkg,
};
use serde_json::json;
use std::sync::Arc;

const RITUAL: RitualId = RitualId(7);
const PLAINTEXT: &[u8] = b"launch codes";

struct Setup {
    ritual: DkgRitualFixture,
    chain: Arc<MockChain>,
    relay: Arc<MockRelay>,
    decrypter: ThresholdDecrypter,
}

impl Setup {
    fn new(script: impl FnOnce(MockRelay) -> MockRelay) -> Self {
        init_test_tracing();
        let ritual = DkgRitualFixture::new(RITUAL, 2, 3);
        let chain = Arc::new(ritual.register(MockChain::new(ChainId::POLYGON)));
        let relay = Arc::new(script(ritual.relay()));
        let decrypter = ThresholdDecrypter::new(chain.clone(), relay.clone(), Arc::new(ToyDkg));
        Self {
            ritual,
            chain,
            relay,
            decrypter,
        }
    }

    async fn kit(&self, conditions: ConditionExpression) -> ThresholdMessageKit {
        encrypt_for_ritual(self.chain.as_ref(), &ToyDkg, RITUAL, PLAINTEXT, conditions)
            .await
            .unwrap()
    }
}

fn after_genesis() -> ConditionExpression {
    ConditionExpression::new(TimeCondition::block_time(ChainId::POLYGON, Comparator::Gt, 0))
}

fn wallet() -> Address {
    "0x1e3d5a0e3d3b3bd0e5a1a3a7b8d7c1f9e0a4b2c6".parse().unwrap()
}

#[tokio::test]
async fn test_honest_ritual_decrypts() {
    let setup = Setup::new(|relay| relay);
    let kit = setup.kit(after_genesis()).await;

    let plaintext = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, setup.ritual.threshold, &kit, None)
        .await
        .unwrap();
    assert_eq!(plaintext, PLAINTEXT);

    let calls = setup.relay.calls().await;
    assert_matches!(
        &calls[..],
        [RecordedCall::Decrypt { ritual_id, participants: 3, contexts }]
            if *ritual_id == RITUAL && contexts.iter().all(|c| c.as_ref().map(|c| c.as_str()) == Some("{}"))
    );
}

#[tokio::test]
async fn test_one_erroring_participant_is_tolerated() {
    let setup = Setup::new(|relay| {
        relay.with_behavior(participant(1), ParticipantBehavior::Error("condition not satisfied".into()))
    });
    let kit = setup.kit(after_genesis()).await;

    let plaintext = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 2, &kit, None)
        .await
        .unwrap();
    assert_eq!(plaintext, PLAINTEXT);
}

#[tokio::test]
async fn test_mismatched_ritual_aborts_the_round() {
    let setup = Setup::new(|relay| {
        relay.with_behavior(participant(2), ParticipantBehavior::WrongRitual(RitualId(8)))
    });
    let kit = setup.kit(after_genesis()).await;

    let err = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 2, &kit, None)
        .await
        .unwrap_err();
    assert_matches!(
        err,
        QuorumError::RitualIdMismatch {
            expected: 7,
            received: 8
        }
    );
}

#[tokio::test]
async fn test_below_threshold_responses_are_never_combined() {
    let setup = Setup::new(|relay| {
        relay
            .with_behavior(participant(1), ParticipantBehavior::Error("condition not satisfied".into()))
            .with_behavior(participant(3), ParticipantBehavior::Silent)
    });
    let kit = setup.kit(after_genesis()).await;

    let err = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 2, &kit, None)
        .await
        .unwrap_err();
    assert_matches!(
        &err,
        QuorumError::ThresholdNotMet { threshold: 2, received: 1, errors }
            if errors.len() == 1 && errors[&participant(1)] == "condition not satisfied"
    );
}

#[tokio::test]
async fn test_resolved_context_reaches_every_participant() {
    let setup = Setup::new(|relay| relay);
    let expression = ConditionExpression::new(RpcCondition::native_balance(
        ChainId::POLYGON,
        ContextVariable::user_address(),
        Comparator::Gt,
        ContextVariable::new(":minBalance").unwrap(),
    ));
    let kit = setup.kit(expression.clone()).await;

    let signer = Arc::new(MockSigner::new(wallet()));
    let context = ConditionContext::builder(expression, setup.chain.clone())
        .signer(signer.clone())
        .custom_param(":minBalance", json!("5"))
        .build()
        .unwrap();

    let plaintext = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 2, &kit, Some(&context))
        .await
        .unwrap();
    assert_eq!(plaintext, PLAINTEXT);
    assert_eq!(signer.prompts(), 1);

    let calls = setup.relay.calls().await;
    let RecordedCall::Decrypt { contexts, .. } = &calls[0] else {
        panic!("expected a decrypt call");
    };
    assert_eq!(contexts.len(), 3);
    for context in contexts {
        let value: serde_json::Value =
            serde_json::from_str(context.as_ref().unwrap().as_str()).unwrap();
        assert_eq!(value[":minBalance"], json!("5"));
        assert_eq!(value[":userAddress"]["address"], json!(wallet().to_string()));
    }
}

#[tokio::test]
async fn test_signer_needed_without_context_fails_before_relay() {
    let setup = Setup::new(|relay| relay);
    let expression = ConditionExpression::new(RpcCondition::native_balance(
        ChainId::POLYGON,
        ContextVariable::user_address(),
        Comparator::Gt,
        json!(0),
    ));
    let kit = setup.kit(expression).await;

    let err = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 2, &kit, None)
        .await
        .unwrap_err();
    assert_matches!(err, QuorumError::SignerRequired { .. });
    assert_eq!(setup.relay.call_count(), 0);
}

#[tokio::test]
async fn test_threshold_larger_than_ritual_is_invalid() {
    let setup = Setup::new(|relay| relay);
    let kit = setup.kit(after_genesis()).await;

    let err = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 4, &kit, None)
        .await
        .unwrap_err();
    assert_matches!(err, QuorumError::Invalid { .. });
    assert_eq!(setup.relay.call_count(), 0);
}

#[tokio::test]
async fn test_shared_directory_fetches_participants_once() {
    let setup = Setup::new(|relay| relay);
    let directory = Arc::new(RitualDirectory::new(setup.chain.clone()));
    let first = ThresholdDecrypter::new(setup.chain.clone(), setup.relay.clone(), Arc::new(ToyDkg))
        .with_directory(directory.clone());
    let second = ThresholdDecrypter::new(setup.chain.clone(), setup.relay.clone(), Arc::new(ToyDkg))
        .with_directory(directory);
    let kit = setup.kit(after_genesis()).await;

    first.retrieve_and_decrypt(RITUAL, 2, &kit, None).await.unwrap();
    second.retrieve_and_decrypt(RITUAL, 2, &kit, None).await.unwrap();
    assert_eq!(setup.chain.participant_lookups(), 1);
    assert_eq!(setup.relay.call_count(), 2);
}

#[tokio::test]
async fn test_unknown_ritual_is_not_found() {
    let setup = Setup::new(|relay| relay);
    let err = encrypt_for_ritual(setup.chain.as_ref(), &ToyDkg, RitualId(99), PLAINTEXT, after_genesis())
        .await
        .unwrap_err();
    assert_matches!(err, QuorumError::NotFound { .. });
}

#[tokio::test]
async fn test_context_resolves_ciphertext_conditions() {
    let setup = Setup::new(|relay| relay);
    let expression = ConditionExpression::new(TimeCondition {
        return_value_test: quorum_conditions::ReturnValueTest::new(
            Comparator::Gt,
            ContextVariable::new(":notBefore").unwrap(),
        ),
        ..TimeCondition::block_time(ChainId::POLYGON, Comparator::Gt, 0)
    });
    let kit = setup.kit(expression).await;

    let bare = ConditionContext::builder(after_genesis(), setup.chain.clone())
        .build()
        .unwrap();
    let err = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 2, &kit, Some(&bare))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        QuorumError::MissingContextParameters { names } if names == vec![":notBefore".to_string()]
    );
    assert_eq!(setup.relay.call_count(), 0);

    let filled = bare
        .with_custom_params([(":notBefore", json!(1_700_000_000))])
        .unwrap();
    let plaintext = setup
        .decrypter
        .retrieve_and_decrypt(RITUAL, 2, &kit, Some(&filled))
        .await
        .unwrap();
    assert_eq!(plaintext, PLAINTEXT);

    let calls = setup.relay.calls().await;
    let RecordedCall::Decrypt { contexts, .. } = &calls[0] else {
        panic!("expected a decrypt call");
    };
    assert!(contexts
        .iter()
        .all(|c| c.as_ref().map(|c| c.as_str()) == Some(r#"{":notBefore":1700000000}"#)));
}
