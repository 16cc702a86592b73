//! Wallet attestation
//!
//! Conditions that reference `:userAddress` are resolved with an EIP-712
//! signature proving control of the address. Signing may prompt the user, so
//! attestations are cached per address: in memory for the lifetime of the
//! cache, and through `StorageEffects` across restarts when storage is given.
//! First use of an address is single-flight: concurrent callers wait on one
//! signature request instead of each prompting.

use quorum_core::effects::{ChainEffects, SignerEffects, StorageEffects};
use quorum_core::handlers::FilesystemStorageHandler;
use quorum_core::types::ChainId;
use quorum_core::{Address, QuorumConfig, QuorumError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

const STORAGE_PREFIX: &str = "auth-signature";

/// Signed typed-data claim over a wallet address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedSignature {
    /// `0x`-prefixed signature
    pub signature: String,
    /// Address the signature claims
    pub address: Address,
    /// The signed EIP-712 payload
    pub typed_data: serde_json::Value,
}

/// Per-address attestation cache
pub struct AuthSignatureCache {
    slots: async_lock::Mutex<HashMap<Address, Arc<OnceCell<TypedSignature>>>>,
    storage: Option<Arc<dyn StorageEffects>>,
}

impl AuthSignatureCache {
    /// Cache that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            slots: async_lock::Mutex::new(HashMap::new()),
            storage: None,
        }
    }

    /// Cache backed by durable storage
    pub fn with_storage(storage: Arc<dyn StorageEffects>) -> Self {
        Self {
            slots: async_lock::Mutex::new(HashMap::new()),
            storage: Some(storage),
        }
    }

    /// Cache persisted under the configured attestation directory
    pub fn from_config(config: &QuorumConfig) -> Self {
        Self::with_storage(Arc::new(FilesystemStorageHandler::new(
            config.auth_cache_dir(),
        )))
    }

    fn storage_key(address: &Address) -> String {
        format!("{STORAGE_PREFIX}/{address}")
    }

    async fn slot(&self, address: Address) -> Arc<OnceCell<TypedSignature>> {
        let mut slots = self.slots.lock().await;
        slots.entry(address).or_default().clone()
    }

    /// Cached attestation without prompting
    pub async fn get(&self, address: &Address) -> Option<TypedSignature> {
        let slots = self.slots.lock().await;
        slots.get(address).and_then(|slot| slot.get().cloned())
    }

    /// Return the attestation for `address`, producing it with `sign` at most once
    pub async fn get_or_try_init<F, Fut>(&self, address: Address, sign: F) -> Result<TypedSignature>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TypedSignature>>,
    {
        let slot = self.slot(address).await;
        let attestation = slot
            .get_or_try_init(|| async {
                if let Some(stored) = self.load(&address).await {
                    tracing::debug!(%address, "using persisted wallet attestation");
                    return Ok(stored);
                }
                let fresh = sign().await?;
                if fresh.address != address {
                    return Err(QuorumError::invalid(format!(
                        "Attestation for {} returned while authenticating {address}",
                        fresh.address
                    )));
                }
                self.persist(&fresh).await;
                Ok(fresh)
            })
            .await?;
        Ok(attestation.clone())
    }

    /// Forget an address in memory and in storage
    pub async fn clear(&self, address: &Address) -> Result<()> {
        self.slots.lock().await.remove(address);
        if let Some(storage) = &self.storage {
            storage.remove(&Self::storage_key(address)).await?;
        }
        Ok(())
    }

    async fn load(&self, address: &Address) -> Option<TypedSignature> {
        let storage = self.storage.as_ref()?;
        let bytes = match storage.retrieve(&Self::storage_key(address)).await {
            Ok(bytes) => bytes?,
            Err(e) => {
                tracing::warn!(%address, error = %e, "failed to read persisted attestation");
                return None;
            }
        };
        match serde_json::from_slice::<TypedSignature>(&bytes) {
            Ok(stored) if stored.address == *address => Some(stored),
            Ok(stored) => {
                tracing::warn!(
                    %address,
                    stored = %stored.address,
                    "ignoring persisted attestation for a different address"
                );
                None
            }
            Err(e) => {
                tracing::warn!(%address, error = %e, "ignoring unreadable persisted attestation");
                None
            }
        }
    }

    async fn persist(&self, attestation: &TypedSignature) {
        let Some(storage) = &self.storage else {
            return;
        };
        let key = Self::storage_key(&attestation.address);
        let result = match serde_json::to_vec(attestation) {
            Ok(bytes) => storage.store(&key, bytes).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!(address = %attestation.address, error = %e, "failed to persist attestation");
        }
    }
}

impl Default for AuthSignatureCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for AuthSignatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSignatureCache")
            .field("durable", &self.storage.is_some())
            .finish_non_exhaustive()
    }
}

/// Produces wallet attestations through a signer
#[derive(Debug, Clone)]
pub struct WalletAuthProvider {
    cache: Arc<AuthSignatureCache>,
    domain_name: String,
    signature_text: String,
}

impl WalletAuthProvider {
    /// Provider with default domain settings
    pub fn new(cache: Arc<AuthSignatureCache>) -> Self {
        Self::from_config(&QuorumConfig::default(), cache)
    }

    /// Provider using the configured EIP-712 domain and signature text
    pub fn from_config(config: &QuorumConfig, cache: Arc<AuthSignatureCache>) -> Self {
        Self {
            cache,
            domain_name: config.eip712_domain_name.clone(),
            signature_text: config.signature_text.clone(),
        }
    }

    /// Shared attestation cache
    pub fn cache(&self) -> &Arc<AuthSignatureCache> {
        &self.cache
    }

    /// Attest the signer's current address, prompting only on first use
    pub async fn authenticate(
        &self,
        signer: &dyn SignerEffects,
        chain: &dyn ChainEffects,
    ) -> Result<TypedSignature> {
        let address = signer.address().await?;
        self.cache
            .get_or_try_init(address, || async {
                let chain_id = chain.chain_id().await?;
                let block_number = chain.block_number().await?;
                let block_hash = chain.block_hash(block_number).await?;
                let typed_data = eip712_typed_data(
                    &self.domain_name,
                    chain_id,
                    address,
                    block_number,
                    &block_hash,
                    &self.signature_text,
                );
                tracing::info!(%address, chain_id = %chain_id, "requesting wallet attestation");
                let signature = signer.sign_typed_data(&typed_data).await?;
                Ok(TypedSignature {
                    signature,
                    address,
                    typed_data,
                })
            })
            .await
    }
}

/// EIP-712 payload attesting control of `address` as of a recent block
pub fn eip712_typed_data(
    domain_name: &str,
    chain_id: ChainId,
    address: Address,
    block_number: u64,
    block_hash: &str,
    signature_text: &str,
) -> serde_json::Value {
    let salt = format!("0x{}", hex::encode(Sha256::digest(domain_name.as_bytes())));
    let text = signature_text
        .replace("{address}", &address.to_string())
        .replace("{blockNumber}", &block_number.to_string());
    serde_json::json!({
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "salt", "type": "bytes32"},
            ],
            "Wallet": [
                {"name": "address", "type": "address"},
                {"name": "signatureText", "type": "string"},
                {"name": "blockNumber", "type": "uint256"},
                {"name": "blockHash", "type": "bytes32"},
            ],
        },
        "primaryType": "Wallet",
        "domain": {
            "name": domain_name,
            "version": "1",
            "chainId": chain_id.0,
            "salt": salt,
        },
        "message": {
            "address": address.to_string(),
            "signatureText": text,
            "blockNumber": block_number,
            "blockHash": block_hash,
        },
    })
}
