//! Unified error system for Quorum
//!
//! A single error type covers every failure the condition engine and the
//! retrieval protocols can surface. None of these are recovered internally:
//! retrieval is all-or-nothing per ciphertext unit.

use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unified error type for all Quorum operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum QuorumError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// A condition or context failed its structural rules
    #[error("Validation failed: {message}")]
    Validation {
        /// Every violation, joined in tree order
        message: String,
    },

    /// Context variables referenced by conditions have no resolved value
    #[error("Missing custom context parameter(s): {}", .names.join(", "))]
    MissingContextParameters {
        /// Names of the unresolved parameters, sorted
        names: Vec<String>,
    },

    /// Conditions require a wallet attestation but no signer is available
    #[error("Signer required: {message}")]
    SignerRequired {
        /// What needed the signer
        message: String,
    },

    /// Fewer verified partial results than the threshold
    #[error(
        "Threshold of {threshold} not met: {received} verified result(s); {}",
        describe_participant_errors(.errors)
    )]
    ThresholdNotMet {
        /// Required number of verified results
        threshold: usize,
        /// Verified results actually obtained
        received: usize,
        /// Per-participant failure reasons (possibly empty)
        errors: BTreeMap<Address, String>,
    },

    /// A decrypted response belongs to a different ritual
    #[error("Ritual id mismatch: expected {expected}, received {received}")]
    RitualIdMismatch {
        /// Ritual the request targeted
        expected: u32,
        /// Ritual embedded in the response
        received: u32,
    },

    /// Serialized object carries a newer major version than this engine
    #[error("Incompatible version {version}: current version is {current}")]
    IncompatibleVersion {
        /// Version found in the input
        version: String,
        /// Version understood by this engine
        current: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Cryptographic operation failed
    #[error("Crypto error: {message}")]
    Crypto {
        /// Error message describing the cryptographic failure
        message: String,
    },

    /// Network or transport error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Storage operation failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

fn describe_participant_errors(errors: &BTreeMap<Address, String>) -> String {
    if errors.is_empty() {
        return "not enough fragments".to_string();
    }
    errors
        .iter()
        .map(|(participant, reason)| format!("{participant}: {reason}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl QuorumError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a missing-parameter error; names are reported sorted
    pub fn missing_parameters<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        Self::MissingContextParameters { names }
    }

    /// Create a signer-required error
    pub fn signer_required(message: impl Into<String>) -> Self {
        Self::SignerRequired {
            message: message.into(),
        }
    }

    /// Create a threshold-not-met error
    pub fn threshold_not_met(
        threshold: usize,
        received: usize,
        errors: BTreeMap<Address, String>,
    ) -> Self {
        Self::ThresholdNotMet {
            threshold,
            received,
            errors,
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a crypto error
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for Quorum operations
pub type Result<T> = std::result::Result<T, QuorumError>;

impl From<serde_json::Error> for QuorumError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<std::io::Error> for QuorumError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::storage(err.to_string()),
        }
    }
}
