//! JSON-RPC conditions

use super::{is_address_param, validate_leaf_common, Comparator, ReturnValueTest};
use crate::errors::{join_path, IssueCollector};
use crate::param::ParamValue;
use quorum_core::types::ChainId;
use serde::{Deserialize, Serialize};

/// RPC methods a condition may call
pub const RPC_METHODS: [&str; 1] = ["eth_getBalance"];

/// Condition over a JSON-RPC call's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCondition {
    /// Chain to query
    pub chain: ChainId,
    /// RPC method
    pub method: String,
    /// Method parameters: an address, then an optional block identifier
    #[serde(default)]
    pub parameters: Vec<ParamValue>,
    /// Expected result
    pub return_value_test: ReturnValueTest,
}

impl RpcCondition {
    /// Native token balance of `owner` compared against `value`
    pub fn native_balance(
        chain: ChainId,
        owner: impl Into<ParamValue>,
        comparator: Comparator,
        value: impl Into<ParamValue>,
    ) -> Self {
        Self {
            chain,
            method: "eth_getBalance".to_string(),
            parameters: vec![owner.into(), ParamValue::literal("latest")],
            return_value_test: ReturnValueTest::new(comparator, value),
        }
    }

    pub(crate) fn validate_at(&self, path: &str, issues: &mut IssueCollector) {
        validate_leaf_common(
            self.chain,
            &self.parameters,
            &self.return_value_test,
            path,
            issues,
        );
        if !RPC_METHODS.contains(&self.method.as_str()) {
            issues.push(
                &join_path(path, "method"),
                format!("unsupported rpc method {}", self.method),
            );
        }
        let parameters_path = join_path(path, "parameters");
        match self.parameters.first() {
            None => issues.push(&parameters_path, "expected an address parameter"),
            Some(_) if self.parameters.len() > 2 => issues.push(
                &parameters_path,
                format!("expected at most 2 parameters, got {}", self.parameters.len()),
            ),
            Some(first) if !is_address_param(first) => issues.push(
                &join_path(&parameters_path, "[0]"),
                "expected an address or context variable",
            ),
            Some(_) => {}
        }
    }
}
