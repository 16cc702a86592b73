//! Wallet stand-in that counts signature prompts

use async_trait::async_trait;
use quorum_core::effects::SignerEffects;
use quorum_core::{Address, QuorumError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const SIGNATURE_LEN: usize = 65;

/// Deterministic signer
#[derive(Debug)]
pub struct MockSigner {
    address: Address,
    prompts: AtomicUsize,
    delay: Option<Duration>,
    reject: bool,
}

impl MockSigner {
    /// Signer for `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            prompts: AtomicUsize::new(0),
            delay: None,
            reject: false,
        }
    }

    /// Wait before answering each prompt, to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Signer whose user declines every prompt
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    /// Number of signature prompts shown so far
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignerEffects for MockSigner {
    async fn address(&self) -> Result<Address> {
        Ok(self.address)
    }

    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<String> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject {
            return Err(QuorumError::signer_required("user rejected the signature request"));
        }
        let mut hasher = blake3::Hasher::new_derive_key("quorum-testkit mock signature");
        hasher.update(self.address.as_bytes());
        hasher.update(typed_data.to_string().as_bytes());
        let mut signature = [0u8; SIGNATURE_LEN];
        hasher.finalize_xof().fill(&mut signature);
        Ok(format!("0x{}", hex::encode(signature)))
    }
}
