//! Versioned condition envelope

use crate::condition::Condition;
use crate::param::ContextVariable;
use quorum_core::protocol::Conditions;
use quorum_core::serialization::SemanticVersion;
use quorum_core::{QuorumError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A root condition tagged with the language version it was written against.
///
/// Equality compares the version string exactly: `0.1.0` and `0.0.1` are
/// different expressions even though both parse under the current engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionExpression {
    /// Semantic version string
    pub version: String,
    /// Root condition
    pub condition: Condition,
}

impl ConditionExpression {
    /// Version written by this engine
    pub const VERSION: &'static str = "1.0.0";

    /// Wrap a condition at the current version
    pub fn new(condition: impl Into<Condition>) -> Self {
        Self {
            version: Self::VERSION.to_string(),
            condition: condition.into(),
        }
    }

    fn current_version() -> Result<SemanticVersion> {
        Self::VERSION.parse()
    }

    /// Validated object form
    pub fn to_obj(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "version": self.version,
            "condition": self.condition.to_obj()?,
        }))
    }

    /// Parse an object form, rejecting newer major versions
    pub fn from_obj(value: &serde_json::Value) -> Result<Self> {
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| QuorumError::validation("Condition expression has no version"))?;
        let parsed: SemanticVersion = version
            .parse()
            .map_err(|_| QuorumError::validation(format!("Invalid version string {version}")))?;
        let current = Self::current_version()?;
        if parsed.major > current.major {
            return Err(QuorumError::IncompatibleVersion {
                version: version.to_string(),
                current: current.to_string(),
            });
        }
        let condition = value
            .get("condition")
            .ok_or_else(|| QuorumError::validation("Condition expression has no condition"))?;
        Ok(Self {
            version: version.to_string(),
            condition: Condition::from_obj(condition)?,
        })
    }

    /// Deterministic string form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_obj()?)?)
    }

    /// Parse the string form
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            QuorumError::validation(format!("Malformed condition expression JSON: {e}"))
        })?;
        Self::from_obj(&value)
    }

    /// Wire form carried next to a ciphertext
    pub fn to_conditions(&self) -> Result<Conditions> {
        Ok(Conditions::new(self.to_json()?))
    }

    /// Parse conditions received over the wire
    pub fn from_conditions(conditions: &Conditions) -> Result<Self> {
        Self::from_json(conditions.as_str())
    }

    /// Context variables referenced by the root condition
    pub fn context_variables(&self) -> BTreeSet<ContextVariable> {
        self.condition.context_variables()
    }

    /// Whether resolution needs a wallet attestation
    pub fn requires_signer(&self) -> bool {
        self.condition.requires_signer()
    }
}
