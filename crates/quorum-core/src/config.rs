//! Client configuration
//!
//! Resolution order: defaults, then an optional TOML file, then `QUORUM_*`
//! environment variables, then validation.

use crate::errors::{QuorumError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const ENV_PREFIX: &str = "QUORUM_";

/// Loading contract shared by configuration types
pub trait ConfigLoader: Sized + Default {
    /// Load configuration from a TOML file
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Apply `QUORUM_*` overrides from the given variables
    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Merge with the process environment
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Defaults, optional file, environment, validation
    fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

/// Network deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Production network
    #[default]
    Mainnet,
    /// Public testnet
    Tapir,
    /// Development network
    Lynx,
}

impl Domain {
    /// Relay endpoint used when none is configured
    pub fn default_porter_uri(&self) -> &'static str {
        match self {
            Domain::Mainnet => "https://porter.nucypher.io",
            Domain::Tapir => "https://porter-tapir.nucypher.io",
            Domain::Lynx => "https://porter-lynx.nucypher.io",
        }
    }
}

impl FromStr for Domain {
    type Err = QuorumError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Domain::Mainnet),
            "tapir" => Ok(Domain::Tapir),
            "lynx" => Ok(Domain::Lynx),
            other => Err(QuorumError::invalid(format!("Unknown domain: {other}"))),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Mainnet => "mainnet",
            Domain::Tapir => "tapir",
            Domain::Lynx => "lynx",
        };
        f.write_str(name)
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumConfig {
    /// Network deployment
    pub domain: Domain,
    /// Explicit relay endpoint; defaults to the domain's
    pub porter_uri: Option<String>,
    /// Directory for persisted wallet attestations; defaults under the user data dir
    pub auth_cache_dir: Option<PathBuf>,
    /// HTTP request timeout toward the relay
    pub request_timeout_ms: u64,
    /// EIP-712 domain name used for wallet attestations
    pub eip712_domain_name: String,
    /// Human-readable text embedded in the attestation message
    pub signature_text: String,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            domain: Domain::default(),
            porter_uri: None,
            auth_cache_dir: None,
            request_timeout_ms: 30_000,
            eip712_domain_name: "TACo".to_string(),
            signature_text: "I'm the owner of address {address} as of block number {blockNumber}"
                .to_string(),
        }
    }
}

impl QuorumConfig {
    /// Effective relay endpoint without trailing slash
    pub fn porter_uri(&self) -> String {
        self.porter_uri
            .as_deref()
            .unwrap_or_else(|| self.domain.default_porter_uri())
            .trim_end_matches('/')
            .to_string()
    }

    /// Effective attestation cache directory
    pub fn auth_cache_dir(&self) -> PathBuf {
        self.auth_cache_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quorum")
                .join("auth")
        })
    }
}

impl ConfigLoader for QuorumConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| QuorumError::invalid(format!("Failed to read config file: {e}")))?;
        toml::from_str(&content).map_err(|e| QuorumError::invalid(format!("Invalid TOML: {e}")))
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "DOMAIN" => self.domain = value.parse()?,
                "PORTER_URI" => self.porter_uri = Some(value),
                "AUTH_CACHE_DIR" => self.auth_cache_dir = Some(PathBuf::from(value)),
                "REQUEST_TIMEOUT_MS" => {
                    self.request_timeout_ms = value.parse().map_err(|_| {
                        QuorumError::invalid(format!("Invalid QUORUM_REQUEST_TIMEOUT_MS: {value}"))
                    })?;
                }
                "EIP712_DOMAIN_NAME" => self.eip712_domain_name = value,
                "SIGNATURE_TEXT" => self.signature_text = value,
                _ => tracing::debug!(variable = %key, "ignoring unknown configuration variable"),
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let uri = self.porter_uri();
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(QuorumError::invalid(format!(
                "Porter URI must be http(s): {uri}"
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(QuorumError::invalid("Request timeout must be positive"));
        }
        if self.eip712_domain_name.is_empty() {
            return Err(QuorumError::invalid("EIP-712 domain name cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_derive_porter_from_domain() {
        let config = QuorumConfig::default();
        assert_eq!(config.porter_uri(), "https://porter.nucypher.io");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "domain = \"tapir\"\nrequest_timeout_ms = 5000").unwrap();

        let mut config = QuorumConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.domain, Domain::Tapir);
        assert_eq!(config.request_timeout_ms, 5000);

        config
            .merge_with_vars(vars(&[
                ("QUORUM_PORTER_URI", "http://localhost:9155/"),
                ("QUORUM_DOMAIN", "lynx"),
                ("HOME", "/ignored"),
            ]))
            .unwrap();
        assert_eq!(config.domain, Domain::Lynx);
        assert_eq!(config.porter_uri(), "http://localhost:9155");
    }

    #[test]
    fn test_env_overrides_attestation_text() {
        let mut config = QuorumConfig::default();
        config
            .merge_with_vars(vars(&[
                ("QUORUM_EIP712_DOMAIN_NAME", "Quorum"),
                ("QUORUM_SIGNATURE_TEXT", "Owner of {address} at block {blockNumber}"),
            ]))
            .unwrap();
        assert_eq!(config.eip712_domain_name, "Quorum");
        assert_eq!(config.signature_text, "Owner of {address} at block {blockNumber}");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = QuorumConfig::default();
        config.porter_uri = Some("ftp://porter".to_string());
        assert!(config.validate().is_err());

        let mut config = QuorumConfig::default();
        assert!(config
            .merge_with_vars(vars(&[("QUORUM_REQUEST_TIMEOUT_MS", "soon")]))
            .is_err());
        assert!(config
            .merge_with_vars(vars(&[("QUORUM_DOMAIN", "moon")]))
            .is_err());
    }
}
