//! Porter HTTP relay client
//!
//! Porter fans requests out to network participants. Binary payloads travel
//! as base64, keys as hex, and every answer is wrapped in a
//! `{ "result": ..., "version": ... }` envelope.

use async_trait::async_trait;
use quorum_core::config::QuorumConfig;
use quorum_core::effects::{DecryptOutcome, DecryptRequest, RelayEffects, RetrieveCfragsRequest};
use quorum_core::protocol::{
    CapsuleFrag, EncryptedThresholdDecryptionResponse, PublicKey, RetrievalOutcome,
};
use quorum_core::serialization::base64_bytes;
use quorum_core::{Address, QuorumError, Result, RitualId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Relay client speaking Porter's HTTP API
#[derive(Debug, Clone)]
pub struct PorterClient {
    base_url: String,
    client: reqwest::Client,
}

impl PorterClient {
    /// Client for `base_url` with default HTTP settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Client for the configured endpoint and timeout
    pub fn from_config(config: &QuorumConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| QuorumError::network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.porter_uri(),
            client,
        })
    }

    /// Endpoint base without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| QuorumError::network(format!("Failed to reach Porter at {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuorumError::network(format!(
                "Porter rejected {path} ({status}): {body}"
            )));
        }

        let envelope: PorterEnvelope<R> = response
            .json()
            .await
            .map_err(|e| QuorumError::network(format!("Failed to parse Porter response: {e}")))?;
        tracing::debug!(path, version = %envelope.version, "Porter response received");
        Ok(envelope.result)
    }
}

#[async_trait]
impl RelayEffects for PorterClient {
    async fn retrieve_cfrags(&self, request: RetrieveCfragsRequest) -> Result<Vec<RetrievalOutcome>> {
        let body = RetrieveCfragsBody::from_request(&request)?;
        let result: RetrieveCfragsResult = self.post("retrieve_cfrags", &body).await?;
        Ok(result.into_outcomes())
    }

    async fn decrypt(&self, request: DecryptRequest) -> Result<DecryptOutcome> {
        let body = DecryptBody::from_request(&request)?;
        let result: DecryptResult = self.post("decrypt", &body).await?;
        result.into_outcome()
    }
}

#[derive(Debug, Deserialize)]
struct PorterEnvelope<R> {
    result: R,
    #[serde(default)]
    version: String,
}

/// Opaque bytes carried as base64 text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
struct Base64Blob(#[serde(with = "base64_bytes")] Vec<u8>);

#[derive(Debug, Serialize)]
struct RetrieveCfragsBody {
    treasure_map: Base64Blob,
    retrieval_kits: Vec<Base64Blob>,
    alice_verifying_key: PublicKey,
    bob_encrypting_key: PublicKey,
    bob_verifying_key: PublicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl RetrieveCfragsBody {
    fn from_request(request: &RetrieveCfragsRequest) -> Result<Self> {
        Ok(Self {
            treasure_map: Base64Blob(request.treasure_map.to_bytes()?),
            retrieval_kits: request
                .retrieval_kits
                .iter()
                .map(|kit| kit.to_bytes().map(Base64Blob))
                .collect::<Result<_>>()?,
            alice_verifying_key: request.publisher_verifying_key.clone(),
            bob_encrypting_key: request.recipient_encrypting_key.clone(),
            bob_verifying_key: request.recipient_verifying_key.clone(),
            context: request.context.as_ref().map(|c| c.as_str().to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RetrieveCfragsResult {
    retrieval_results: Vec<WireRetrievalResult>,
}

#[derive(Debug, Deserialize)]
struct WireRetrievalResult {
    #[serde(default)]
    cfrags: BTreeMap<Address, CapsuleFrag>,
    #[serde(default)]
    errors: BTreeMap<Address, String>,
}

impl RetrieveCfragsResult {
    fn into_outcomes(self) -> Vec<RetrievalOutcome> {
        self.retrieval_results
            .into_iter()
            .map(|result| RetrievalOutcome {
                cfrags: result.cfrags,
                errors: result.errors,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct DecryptBody {
    ritual_id: RitualId,
    threshold: usize,
    encrypted_decryption_requests: BTreeMap<Address, Base64Blob>,
}

impl DecryptBody {
    fn from_request(request: &DecryptRequest) -> Result<Self> {
        Ok(Self {
            ritual_id: request.ritual_id,
            threshold: request.threshold,
            encrypted_decryption_requests: request
                .encrypted_requests
                .iter()
                .map(|(participant, sealed)| Ok((*participant, Base64Blob(sealed.to_bytes()?))))
                .collect::<Result<_>>()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DecryptResult {
    decryption_results: WireDecryptionResults,
}

#[derive(Debug, Deserialize)]
struct WireDecryptionResults {
    #[serde(default)]
    encrypted_decryption_responses: BTreeMap<Address, Base64Blob>,
    #[serde(default)]
    errors: BTreeMap<Address, String>,
}

impl DecryptResult {
    fn into_outcome(self) -> Result<DecryptOutcome> {
        let results = self.decryption_results;
        let encrypted_responses = results
            .encrypted_decryption_responses
            .into_iter()
            .map(|(participant, blob)| {
                Ok((
                    participant,
                    EncryptedThresholdDecryptionResponse::from_bytes(&blob.0)?,
                ))
            })
            .collect::<Result<_>>()?;
        Ok(DecryptOutcome {
            encrypted_responses,
            errors: results.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_core::crypto::SessionStaticSecret;
    use quorum_core::protocol::{
        Capsule, Context, DecryptionShare, EncryptedKeyFrag, RetrievalKit,
        ThresholdDecryptionResponse, TreasureMap,
    };
    use serde_json::json;

    fn node(b: u8) -> Address {
        Address::new([b; 20])
    }

    #[test]
    fn test_retrieve_cfrags_body_encoding() {
        let request = RetrieveCfragsRequest {
            treasure_map: TreasureMap {
                threshold: 1,
                destinations: [(node(1), EncryptedKeyFrag::from_bytes(vec![1]))]
                    .into_iter()
                    .collect(),
                policy_encrypting_key: PublicKey::from_bytes(vec![1; 4]),
                publisher_verifying_key: PublicKey::from_bytes(vec![2; 4]),
            },
            retrieval_kits: vec![RetrievalKit {
                capsule: Capsule::from_bytes(vec![3; 8]),
                queried_addresses: [node(1)].into_iter().collect(),
                conditions: None,
            }],
            publisher_verifying_key: PublicKey::from_bytes(vec![2; 4]),
            recipient_encrypting_key: PublicKey::from_bytes(vec![0xab; 2]),
            recipient_verifying_key: PublicKey::from_bytes(vec![0xcd; 2]),
            context: Some(Context::new("{}")),
        };

        let body = serde_json::to_value(RetrieveCfragsBody::from_request(&request).unwrap()).unwrap();
        assert_eq!(body["bob_encrypting_key"], json!("abab"));
        assert_eq!(body["context"], json!("{}"));
        let kit = base64_bytes::decode(body["retrieval_kits"][0].as_str().unwrap()).unwrap();
        assert_eq!(RetrievalKit::from_bytes(&kit).unwrap(), request.retrieval_kits[0]);
    }

    #[test]
    fn test_retrieve_cfrags_result_decoding() {
        let raw = json!({
            "result": {
                "retrieval_results": [
                    {
                        "cfrags": { "0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED": "AQID" },
                        "errors": { "0x0101010101010101010101010101010101010101": "timeout" }
                    },
                    {}
                ]
            },
            "version": "3.4.0"
        });
        let envelope: PorterEnvelope<RetrieveCfragsResult> = serde_json::from_value(raw).unwrap();
        assert_eq!(envelope.version, "3.4.0");

        let outcomes = envelope.result.into_outcomes();
        assert_eq!(outcomes.len(), 2);
        let holder: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(outcomes[0].cfrags[&holder], CapsuleFrag::from_bytes(vec![1, 2, 3]));
        assert_eq!(outcomes[0].errors[&node(1)], "timeout");
        assert_eq!(outcomes[1], RetrievalOutcome::default());
    }

    #[test]
    fn test_decrypt_result_decoding() {
        let participant = SessionStaticSecret::random();
        let requester = SessionStaticSecret::random();
        let shared = participant
            .derive_shared_secret(&requester.public_key())
            .unwrap();
        let sealed = ThresholdDecryptionResponse {
            ritual_id: RitualId(3),
            decryption_share: DecryptionShare::from_bytes(vec![4; 8]),
        }
        .encrypt(&shared)
        .unwrap();

        let raw = json!({
            "result": {
                "decryption_results": {
                    "encrypted_decryption_responses": {
                        node(2).to_string(): base64_bytes::encode(&sealed.to_bytes().unwrap())
                    },
                    "errors": { node(3).to_string(): "condition not satisfied" }
                }
            },
            "version": "3.4.0"
        });
        let envelope: PorterEnvelope<DecryptResult> = serde_json::from_value(raw).unwrap();
        let outcome = envelope.result.into_outcome().unwrap();
        assert_eq!(outcome.encrypted_responses[&node(2)], sealed);
        assert_eq!(outcome.errors[&node(3)], "condition not satisfied");
    }

    #[test]
    fn test_base_url_normalized() {
        assert_eq!(PorterClient::new("http://porter:9155/").base_url(), "http://porter:9155");
        let config = QuorumConfig::default();
        assert_eq!(
            PorterClient::from_config(&config).unwrap().base_url(),
            "https://porter.nucypher.io"
        );
    }
}
