//! Per-unit accumulation of verified fragments and participant errors
//!
//! A [`RetrievalResult`] only ever holds fragments that passed verification.
//! Its fragment map and error map never share a key: a participant either
//! contributed a verified fragment or has a reason recorded for why it did not.

use quorum_core::protocol::VerifiedCapsuleFrag;
use quorum_core::serialization::{base64_bytes, to_canonical_json};
use quorum_core::{Address, Result};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Verified fragments and errors for one ciphertext unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalResult {
    cfrags: BTreeMap<Address, VerifiedCapsuleFrag>,
    errors: BTreeMap<Address, String>,
}

impl RetrievalResult {
    /// Build from fragment and error maps.
    ///
    /// A participant present in both maps keeps its fragment; the error is
    /// discarded.
    pub fn new(
        cfrags: BTreeMap<Address, VerifiedCapsuleFrag>,
        mut errors: BTreeMap<Address, String>,
    ) -> Self {
        errors.retain(|participant, _| !cfrags.contains_key(participant));
        Self { cfrags, errors }
    }

    /// Result with nothing collected yet
    pub fn empty() -> Self {
        Self::default()
    }

    /// Verified fragments by participant
    pub fn cfrags(&self) -> &BTreeMap<Address, VerifiedCapsuleFrag> {
        &self.cfrags
    }

    /// Failure reasons by participant
    pub fn errors(&self) -> &BTreeMap<Address, String> {
        &self.errors
    }

    /// Number of verified fragments
    pub fn verified_count(&self) -> usize {
        self.cfrags.len()
    }

    /// Merge a later round into this one, returning the combined result.
    ///
    /// Entries from `other` overwrite entries for the same participant. A
    /// verified fragment from either side always beats an error.
    pub fn with_result(&self, other: &RetrievalResult) -> RetrievalResult {
        let mut cfrags = self.cfrags.clone();
        cfrags.extend(
            other
                .cfrags
                .iter()
                .map(|(participant, cfrag)| (*participant, cfrag.clone())),
        );

        let mut errors = self.errors.clone();
        errors.extend(
            other
                .errors
                .iter()
                .map(|(participant, reason)| (*participant, reason.clone())),
        );

        Self::new(cfrags, errors)
    }

    /// Consume into the verified fragments, in participant order
    pub fn into_cfrags(self) -> Vec<VerifiedCapsuleFrag> {
        self.cfrags.into_values().collect()
    }

    /// Diagnostic object form: fragments as base64, errors verbatim
    pub fn to_obj(&self) -> Value {
        let cfrags: Map<String, Value> = self
            .cfrags
            .iter()
            .map(|(participant, cfrag)| {
                (
                    participant.to_string(),
                    Value::String(base64_bytes::encode(cfrag.as_cfrag().as_bytes())),
                )
            })
            .collect();
        let errors: Map<String, Value> = self
            .errors
            .iter()
            .map(|(participant, reason)| (participant.to_string(), Value::String(reason.clone())))
            .collect();
        json!({ "cfrags": cfrags, "errors": errors })
    }

    /// Deterministic string form of [`RetrievalResult::to_obj`]
    pub fn to_json(&self) -> Result<String> {
        to_canonical_json(&self.to_obj())
    }
}
