//! Serialized condition and context payloads
//!
//! Participants receive conditions and the resolved context as JSON strings.
//! These newtypes keep the strings distinct from arbitrary text at the type
//! level without committing this crate to the condition model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialized condition expression (JSON)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditions(String);

impl Conditions {
    /// Wrap a serialized expression
    pub fn new(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    /// JSON text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON text as bytes, used as associated data when encrypting
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serialized, resolved context value map (JSON)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(String);

impl Context {
    /// Wrap a serialized context map
    pub fn new(json: impl Into<String>) -> Self {
        Self(json.into())
    }

    /// JSON text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
