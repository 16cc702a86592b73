//! Durable key-value storage interface

use crate::errors::Result;
use async_trait::async_trait;

/// Process-external persistence
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Store a value under a key, replacing any previous value
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Retrieve the value stored under a key
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove a key, returning whether it existed
    async fn remove(&self, key: &str) -> Result<bool>;
}
