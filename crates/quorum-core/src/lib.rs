//! Quorum Core - Foundation for Threshold-Gated Retrieval
//!
//! This crate provides the foundational types and collaborator interfaces shared
//! by the condition engine and the retrieval protocols. It carries no protocol
//! logic of its own.
//!
//! # Architecture Layers
//!
//! ## Identifiers
//! - `Address`: 20-byte participant / wallet address
//! - `ChainId`, `RitualId`: on-chain addressing
//!
//! ## Wire Objects
//! - Re-encryption: `Capsule`, `CapsuleFrag`, `VerifiedCapsuleFrag`, `TreasureMap`, `RetrievalKit`
//! - Threshold decryption: `ThresholdDecryptionRequest`, `ThresholdDecryptionResponse` and
//!   their encrypted forms
//!
//! ## Effect Interfaces (Pure Signatures)
//! - `ChainEffects`: chain id, block lookups, ritual state
//! - `SignerEffects`: typed-data signing
//! - `RelayEffects`: batched fan-out through the relay
//! - `ReencryptionScheme`, `ThresholdScheme`: opaque cryptographic primitives
//! - `StorageEffects`: durable key-value persistence
//!
//! ## Session Cryptography
//! - X25519 session keys, pairwise shared secrets and authenticated encryption
//!   for decryption requests and responses

#![forbid(unsafe_code)]

/// Unified error handling
pub mod errors;

/// Address, chain and ritual identifiers
pub mod types;

/// Canonical binary/JSON encoding and byte helpers
pub mod serialization;

/// Wire objects exchanged with the relay and participants
pub mod protocol;

/// Session key agreement and request encryption
pub mod crypto;

/// Collaborator interfaces (no implementations)
pub mod effects;

/// Production effect handlers
pub mod handlers;

/// Client configuration
pub mod config;

pub use config::{ConfigLoader, Domain, QuorumConfig};
pub use errors::{QuorumError, Result};
pub use types::{Address, ChainId, RitualId};
