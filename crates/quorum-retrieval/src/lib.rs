//! Quorum Retrieval - Threshold Retrieval Orchestration
//!
//! Drives the two retrieval flavours against an injected relay:
//!
//! - [`PreDecrypter`]: re-encryption fragments for policy ciphertexts. Each
//!   returned fragment is verified before it counts toward the policy
//!   threshold, and per-participant errors are kept for diagnostics.
//! - [`ThresholdDecrypter`]: decryption shares for ritual ciphertexts, with
//!   per-participant sealed requests under a fresh ephemeral session key.
//!
//! Both make one batched relay call per round and are all-or-nothing per
//! ciphertext unit. [`PorterClient`] is the HTTP relay used in production.

#![forbid(unsafe_code)]

/// Ritual participant cache
pub mod directory;

/// Decryption-share retrieval
pub mod dkg;

/// Ciphertext production
pub mod encrypt;

/// Ciphertext units and policy-bound kits
pub mod kits;

/// Porter HTTP relay client
pub mod porter;

/// Fragment retrieval
pub mod pre;

/// Per-unit retrieval accumulation
pub mod result;

pub use directory::RitualDirectory;
pub use dkg::ThresholdDecrypter;
pub use encrypt::{encrypt_for_policy, encrypt_for_ritual};
pub use kits::{MessageKit, PolicyMessageKit, ThresholdMessageKit};
pub use porter::PorterClient;
pub use pre::{PreDecrypter, PrePolicy, FRAGMENT_VERIFICATION_FAILED};
pub use result::RetrievalResult;
