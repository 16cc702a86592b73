//! Boolean combinations of conditions

use super::Condition;
use crate::errors::{join_path, IssueCollector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum operand count of a compound condition
pub const MIN_OPERANDS: usize = 2;

/// Boolean operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundOperator {
    /// All operands must hold
    And,
    /// At least one operand must hold
    Or,
}

impl fmt::Display for CompoundOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompoundOperator::And => f.write_str("and"),
            CompoundOperator::Or => f.write_str("or"),
        }
    }
}

/// Ordered operands joined by one operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundCondition {
    /// Joining operator
    pub operator: CompoundOperator,
    /// Operands in evaluation order
    pub operands: Vec<Condition>,
}

impl CompoundCondition {
    /// Combine operands
    pub fn new(operator: CompoundOperator, operands: Vec<Condition>) -> Self {
        Self { operator, operands }
    }

    pub(crate) fn validate_at(&self, path: &str, issues: &mut IssueCollector) {
        let operands_path = join_path(path, "operands");
        if self.operands.len() < MIN_OPERANDS {
            issues.push(
                &operands_path,
                format!(
                    "{} requires at least {MIN_OPERANDS} operands, got {}",
                    self.operator,
                    self.operands.len()
                ),
            );
        }
        for (i, operand) in self.operands.iter().enumerate() {
            operand.validate_at(&join_path(&operands_path, &format!("[{i}]")), issues);
        }
    }
}
