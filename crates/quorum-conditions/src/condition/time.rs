//! Block-time conditions

use super::{validate_leaf_common, Comparator, ReturnValueTest};
use crate::errors::{join_path, IssueCollector};
use crate::param::ParamValue;
use quorum_core::types::ChainId;
use serde::{Deserialize, Serialize};

const BLOCKTIME_METHOD: &str = "blocktime";

/// Condition over the latest block's timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeCondition {
    /// Chain whose block time is read
    pub chain: ChainId,
    /// Always `blocktime`
    pub method: String,
    /// Unused; must be empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParamValue>,
    /// Expected timestamp comparison
    pub return_value_test: ReturnValueTest,
}

impl TimeCondition {
    /// Block timestamp compared against a unix time
    pub fn block_time(chain: ChainId, comparator: Comparator, timestamp: u64) -> Self {
        Self {
            chain,
            method: BLOCKTIME_METHOD.to_string(),
            parameters: Vec::new(),
            return_value_test: ReturnValueTest::new(comparator, timestamp),
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
        if self.method != BLOCKTIME_METHOD {
            issues.push(
                &join_path(path, "method"),
                format!("expected {BLOCKTIME_METHOD}, got {}", self.method),
            );
        }
        if !self.parameters.is_empty() {
            issues.push(&join_path(path, "parameters"), "blocktime takes no parameters");
        }
        let numeric = match &self.return_value_test.value {
            ParamValue::Variable(_) => true,
            ParamValue::Literal(value) => value.is_number(),
        };
        if !numeric {
            issues.push(
                &join_path(path, "returnValueTest.value"),
                "expected a number or context variable",
            );
        }
    }
}
