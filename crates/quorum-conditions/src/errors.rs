//! Condition validation errors
//!
//! Validation is a pure function: it never panics and reports every violation
//! it finds, each tagged with its location in the condition tree.

use quorum_core::QuorumError;
use std::fmt;

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Location in the condition tree, e.g. `operands[1].returnValueTest.value`
    pub path: String,
    /// What is wrong
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// All violations found in one condition tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe_issues(.issues))]
pub struct ConditionError {
    /// Violations in tree order
    pub issues: Vec<ValidationIssue>,
}

fn describe_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConditionError {
    /// Single-issue error
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// Whether any issue is reported at or below `path`
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path.starts_with(path))
    }
}

impl From<ConditionError> for QuorumError {
    fn from(err: ConditionError) -> Self {
        QuorumError::validation(err.to_string())
    }
}

/// Accumulates issues while walking a condition tree
#[derive(Debug, Default)]
pub(crate) struct IssueCollector {
    issues: Vec<ValidationIssue>,
}

impl IssueCollector {
    pub(crate) fn push(&mut self, path: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path: path.to_string(),
            message: message.into(),
        });
    }

    pub(crate) fn finish(self) -> Result<(), ConditionError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ConditionError {
                issues: self.issues,
            })
        }
    }
}

/// Join a parent path with a field name
pub(crate) fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else if field.starts_with('[') {
        format!("{parent}{field}")
    } else {
        format!("{parent}.{field}")
    }
}
