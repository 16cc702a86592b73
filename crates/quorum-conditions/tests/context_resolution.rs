//! Context resolution against mock chain and signer

use assert_matches::assert_matches;
use quorum_conditions::{
    AuthSignatureCache, Comparator, Condition, ConditionContext, ConditionExpression,
    ContextVariable, ContractCondition, RpcCondition, TimeCondition, WalletAuthProvider,
};
use quorum_core::effects::{ChainEffects, SignerEffects, StorageEffects};
use quorum_core::handlers::FilesystemStorageHandler;
use quorum_core::types::ChainId;
use quorum_core::{Address, QuorumError};
use quorum_testkit::{init_test_tracing, MemoryStorageHandler, MockChain, MockSigner};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn wallet() -> Address {
    "0x1e3d5a0e3d3b3bd0e5a1a3a7b8d7c1f9e0a4b2c6".parse().unwrap()
}

fn chain() -> Arc<MockChain> {
    Arc::new(MockChain::new(ChainId::POLYGON))
}

fn var(name: &str) -> ContextVariable {
    ContextVariable::new(name).unwrap()
}

/// Owner of `:tokenId`, holding at least `:minBalance`, after `:notBefore`
fn gated_expression() -> ConditionExpression {
    let nft: Address = "0x00000000000000000000000000000000000000bb".parse().unwrap();
    ConditionExpression::new(Condition::and(vec![
        ContractCondition::erc721_ownership(ChainId::POLYGON, nft, var(":tokenId")).into(),
        RpcCondition::native_balance(
            ChainId::POLYGON,
            ContextVariable::user_address(),
            Comparator::Ge,
            var(":minBalance"),
        )
        .into(),
        TimeCondition {
            return_value_test: quorum_conditions::ReturnValueTest::new(
                Comparator::Gt,
                var(":notBefore"),
            ),
            ..TimeCondition::block_time(ChainId::POLYGON, Comparator::Gt, 0)
        }
        .into(),
    ]))
}

fn no_signer_expression() -> ConditionExpression {
    ConditionExpression::new(TimeCondition {
        return_value_test: quorum_conditions::ReturnValueTest::new(
            Comparator::Gt,
            var(":notBefore"),
        ),
        ..TimeCondition::block_time(ChainId::ETHEREUM, Comparator::Gt, 0)
    })
}

#[tokio::test]
async fn test_unprefixed_custom_parameter_rejected_before_any_call() {
    init_test_tracing();
    let chain = chain();
    let signer = Arc::new(MockSigner::new(wallet()));

    let result = ConditionContext::builder(gated_expression(), chain.clone())
        .signer(signer.clone())
        .custom_param("tokenId", json!(1))
        .build();

    assert_matches!(result, Err(QuorumError::Invalid { message }) if message.contains("tokenId"));
    assert_eq!(chain.block_lookups(), 0);
    assert_eq!(signer.prompts(), 0);
}

#[tokio::test]
async fn test_reserved_and_malformed_names_rejected() {
    let result = ConditionContext::builder(no_signer_expression(), chain())
        .custom_param(":userAddress", json!("0x00"))
        .build();
    assert_matches!(result, Err(QuorumError::Invalid { message }) if message.contains("reserved"));

    let result = ConditionContext::builder(no_signer_expression(), chain())
        .custom_param(":2fast", json!(1))
        .build();
    assert_matches!(result, Err(QuorumError::Invalid { .. }));

    let result = ConditionContext::builder(no_signer_expression(), chain())
        .custom_param(":notBefore", serde_json::Value::Null)
        .build();
    assert_matches!(result, Err(QuorumError::Invalid { .. }));
}

#[tokio::test]
async fn test_signer_required_at_construction() {
    let result = ConditionContext::builder(gated_expression(), chain()).build();
    assert_matches!(result, Err(QuorumError::SignerRequired { .. }));

    let ok = ConditionContext::builder(no_signer_expression(), chain()).build();
    assert!(ok.is_ok());
}

#[tokio::test]
async fn test_missing_parameters_named_exactly() {
    let signer = Arc::new(MockSigner::new(wallet()));
    let context = ConditionContext::builder(gated_expression(), chain())
        .signer(signer.clone())
        .custom_param(":tokenId", json!(7))
        .build()
        .unwrap();

    let err = context.to_obj().await.unwrap_err();
    assert_matches!(
        &err,
        QuorumError::MissingContextParameters { names }
            if names == &vec![":minBalance".to_string(), ":notBefore".to_string()]
    );
    assert_eq!(
        err.to_string(),
        "Missing custom context parameter(s): :minBalance, :notBefore"
    );
    assert_eq!(signer.prompts(), 0);
}

#[tokio::test]
async fn test_resolves_attestation_once_and_copies_every_custom_param() {
    let signer = Arc::new(MockSigner::new(wallet()));
    let context = ConditionContext::builder(gated_expression(), chain())
        .signer(signer.clone())
        .custom_params([
            (":tokenId", json!(7)),
            (":minBalance", json!("1000")),
            (":notBefore", json!(1_700_000_000u64)),
            (":unused", json!(true)),
        ])
        .build()
        .unwrap();

    let resolved = context.to_obj().await.unwrap();
    assert_eq!(resolved.len(), 5);
    assert_eq!(resolved[":unused"], json!(true));
    let attestation = &resolved[":userAddress"];
    assert_eq!(attestation["address"], json!(wallet().to_string()));
    assert_eq!(attestation["typedData"]["domain"]["chainId"], json!(137));
    assert!(attestation["signature"].as_str().unwrap().starts_with("0x"));

    let again = context.to_json().await.unwrap();
    assert_eq!(signer.prompts(), 1);
    assert!(again.as_str().starts_with(r#"{":minBalance":"1000",":notBefore""#));
}

#[tokio::test]
async fn test_with_custom_params_leaves_original_untouched() {
    let base = ConditionContext::builder(no_signer_expression(), chain())
        .build()
        .unwrap();
    let extended = base
        .with_custom_params([(":notBefore", json!(5))])
        .unwrap();

    assert!(base.custom_params().is_empty());
    assert_matches!(
        base.to_obj().await,
        Err(QuorumError::MissingContextParameters { .. })
    );
    assert_eq!(extended.to_obj().await.unwrap()[":notBefore"], json!(5));
    assert!(base.with_custom_params([("notBefore", json!(5))]).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_prompts_once() {
    let signer = Arc::new(MockSigner::new(wallet()).with_delay(Duration::from_millis(50)));
    let auth = WalletAuthProvider::new(Arc::new(AuthSignatureCache::in_memory()));
    let expression = ConditionExpression::new(RpcCondition::native_balance(
        ChainId::POLYGON,
        ContextVariable::user_address(),
        Comparator::Gt,
        json!(0),
    ));

    let contexts: Vec<ConditionContext> = (0..4)
        .map(|_| {
            ConditionContext::builder(expression.clone(), chain())
                .signer(signer.clone())
                .auth_provider(auth.clone())
                .build()
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = contexts
        .into_iter()
        .map(|context| tokio::spawn(async move { context.to_obj().await }))
        .collect();
    let mut signatures = Vec::new();
    for handle in handles {
        let resolved = handle.await.unwrap().unwrap();
        signatures.push(resolved[":userAddress"]["signature"].clone());
    }

    assert_eq!(signer.prompts(), 1);
    assert!(signatures.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn test_rejected_prompt_is_retried_next_time() {
    let rejecting = Arc::new(MockSigner::new(wallet()).rejecting());
    let auth = WalletAuthProvider::new(Arc::new(AuthSignatureCache::in_memory()));
    let chain: Arc<dyn ChainEffects> = chain();

    assert!(auth.authenticate(&*rejecting, chain.as_ref()).await.is_err());
    let signer = MockSigner::new(wallet());
    assert!(auth.authenticate(&signer, chain.as_ref()).await.is_ok());
    assert_eq!(signer.prompts(), 1);
}

#[tokio::test]
async fn test_attestation_survives_restart_through_storage() {
    let storage = Arc::new(MemoryStorageHandler::new());
    let chain: Arc<dyn ChainEffects> = chain();

    let first = MockSigner::new(wallet());
    let auth = WalletAuthProvider::new(Arc::new(AuthSignatureCache::with_storage(storage.clone())));
    let original = auth.authenticate(&first, chain.as_ref()).await.unwrap();
    assert_eq!(first.prompts(), 1);

    let restarted = WalletAuthProvider::new(Arc::new(AuthSignatureCache::with_storage(storage.clone())));
    let second = MockSigner::new(wallet());
    let restored = restarted.authenticate(&second, chain.as_ref()).await.unwrap();
    assert_eq!(second.prompts(), 0);
    assert_eq!(restored, original);

    let key = format!("auth-signature/{}", wallet());
    assert!(storage.retrieve(&key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_stored_attestation_for_other_address_ignored() {
    let storage = Arc::new(MemoryStorageHandler::new());
    let chain: Arc<dyn ChainEffects> = chain();
    let other = Address::new([0x42; 20]);

    let other_signer = MockSigner::new(other);
    let auth = WalletAuthProvider::new(Arc::new(AuthSignatureCache::with_storage(storage.clone())));
    let foreign = auth.authenticate(&other_signer, chain.as_ref()).await.unwrap();

    // Plant the other wallet's attestation under our key
    storage
        .store(
            &format!("auth-signature/{}", wallet()),
            serde_json::to_vec(&foreign).unwrap(),
        )
        .await
        .unwrap();

    let signer = MockSigner::new(wallet());
    let fresh = WalletAuthProvider::new(Arc::new(AuthSignatureCache::with_storage(storage)));
    let ours = fresh.authenticate(&signer, chain.as_ref()).await.unwrap();
    assert_eq!(signer.prompts(), 1);
    assert_eq!(ours.address, wallet());
    assert_eq!(signer.address().await.unwrap(), wallet());
}

#[tokio::test]
async fn test_attestation_persists_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let chain: Arc<dyn ChainEffects> = chain();

    let first = MockSigner::new(wallet());
    let storage = Arc::new(FilesystemStorageHandler::new(dir.path()));
    let auth = WalletAuthProvider::new(Arc::new(AuthSignatureCache::with_storage(storage)));
    let original = auth.authenticate(&first, chain.as_ref()).await.unwrap();

    let reopened = Arc::new(FilesystemStorageHandler::new(dir.path()));
    let restarted = WalletAuthProvider::new(Arc::new(AuthSignatureCache::with_storage(reopened)));
    let second = MockSigner::new(wallet());
    assert_eq!(
        restarted.authenticate(&second, chain.as_ref()).await.unwrap(),
        original
    );
    assert_eq!(second.prompts(), 0);
}

#[tokio::test]
async fn test_rebinding_resolves_the_new_expression() {
    let context = ConditionContext::builder(
        ConditionExpression::new(TimeCondition::block_time(ChainId::POLYGON, Comparator::Gt, 0)),
        chain(),
    )
    .custom_param(":tokenId", json!(7))
    .build()
    .unwrap();
    assert_eq!(context.to_json().await.unwrap().as_str(), r#"{":tokenId":7}"#);

    let rebound = context.for_expression(no_signer_expression()).unwrap();
    assert_eq!(rebound.expression(), &no_signer_expression());
    assert_eq!(rebound.custom_params(), context.custom_params());
    let err = rebound.to_obj().await.unwrap_err();
    assert_matches!(
        err,
        QuorumError::MissingContextParameters { names } if names == vec![":notBefore".to_string()]
    );

    let err = context.for_expression(gated_expression()).unwrap_err();
    assert_matches!(err, QuorumError::SignerRequired { .. });
}
