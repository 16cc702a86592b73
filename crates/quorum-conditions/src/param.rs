//! Context variables
//!
//! On the wire a context variable is any string starting with `:`. In memory
//! it is an explicit [`ParamValue::Variable`], so no consumer has to sniff
//! prefixes; the prefix encoding is applied only at the serde boundary.

use quorum_core::{QuorumError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Prefix marking a context variable
pub const CONTEXT_PARAM_PREFIX: char = ':';

/// Reserved variable resolved through a wallet attestation
pub const USER_ADDRESS_PARAM: &str = ":userAddress";

/// Variables callers may never supply literally
pub const RESERVED_CONTEXT_PARAMS: [&str; 1] = [USER_ADDRESS_PARAM];

/// Name of a symbolic parameter, including its `:` prefix
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextVariable(String);

impl ContextVariable {
    /// Parse a well-formed variable name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !name.starts_with(CONTEXT_PARAM_PREFIX) {
            return Err(QuorumError::invalid(format!(
                "Context parameter {name} must start with '{CONTEXT_PARAM_PREFIX}'"
            )));
        }
        if !Self::is_well_formed(&name) {
            return Err(QuorumError::invalid(format!(
                "Context parameter {name} must match :[A-Za-z_][A-Za-z0-9_]*"
            )));
        }
        Ok(Self(name))
    }

    /// The reserved wallet-address variable
    pub fn user_address() -> Self {
        Self(USER_ADDRESS_PARAM.to_string())
    }

    /// Keep a prefixed name as found on the wire; validation reports bad names later
    pub(crate) fn from_wire(name: String) -> Self {
        Self(name)
    }

    /// Name including prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a reserved variable
    pub fn is_reserved(&self) -> bool {
        RESERVED_CONTEXT_PARAMS.contains(&self.0.as_str())
    }

    /// Whether a name matches `:[A-Za-z_][A-Za-z0-9_]*`
    pub fn is_well_formed(name: &str) -> bool {
        let Some(rest) = name.strip_prefix(CONTEXT_PARAM_PREFIX) else {
            return false;
        };
        let mut chars = rest.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl fmt::Display for ContextVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ContextVariable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContextVariable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

/// Method parameter or comparison target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum ParamValue {
    /// Symbolic parameter resolved from the condition context
    Variable(ContextVariable),
    /// Concrete JSON value
    Literal(serde_json::Value),
}

impl ParamValue {
    /// Literal from anything convertible to JSON
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        ParamValue::Literal(value.into())
    }

    /// Variable reference
    pub fn variable(variable: ContextVariable) -> Self {
        ParamValue::Variable(variable)
    }

    /// The variable, if this is one
    pub fn as_variable(&self) -> Option<&ContextVariable> {
        match self {
            ParamValue::Variable(variable) => Some(variable),
            ParamValue::Literal(_) => None,
        }
    }

    /// The literal, if this is one
    pub fn as_literal(&self) -> Option<&serde_json::Value> {
        match self {
            ParamValue::Literal(value) => Some(value),
            ParamValue::Variable(_) => None,
        }
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) if s.starts_with(CONTEXT_PARAM_PREFIX) => {
                ParamValue::Variable(ContextVariable::from_wire(s))
            }
            other => ParamValue::Literal(other),
        }
    }
}

impl From<ParamValue> for serde_json::Value {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Variable(variable) => serde_json::Value::String(variable.0),
            ParamValue::Literal(value) => value,
        }
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Literal(value.into())
    }
}

impl From<ContextVariable> for ParamValue {
    fn from(variable: ContextVariable) -> Self {
        ParamValue::Variable(variable)
    }
}
