//! Wallet signing interface

use crate::errors::Result;
use crate::types::Address;
use async_trait::async_trait;

/// External wallet able to sign EIP-712 typed data
///
/// `sign_typed_data` may prompt the user interactively.
#[async_trait]
pub trait SignerEffects: Send + Sync {
    /// Address the signer signs for
    async fn address(&self) -> Result<Address>;

    /// Sign typed structured data, returning a `0x`-prefixed signature
    async fn sign_typed_data(&self, typed_data: &serde_json::Value) -> Result<String>;
}
