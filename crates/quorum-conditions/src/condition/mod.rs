//! Access conditions
//!
//! A [`Condition`] is a closed sum over the leaf kinds and the boolean
//! compound. Conditions are plain data: construction never validates, and
//! [`Condition::validate`] is a pure function that reports every violation in
//! the tree. Serialization boundaries (`to_obj`, `to_json`, `from_obj`)
//! validate and return `Err` for invalid trees.

mod compound;
mod contract;
mod rpc;
mod time;

pub use compound::{CompoundCondition, CompoundOperator};
pub use contract::{AbiParameter, ContractCondition, FunctionAbi, StandardContractType};
pub use rpc::RpcCondition;
pub use time::TimeCondition;

use crate::errors::{join_path, ConditionError, IssueCollector};
use crate::param::{ContextVariable, ParamValue};
use quorum_core::types::ChainId;
use quorum_core::{QuorumError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Predicate over on-chain facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "conditionType", rename_all = "lowercase")]
pub enum Condition {
    /// JSON-RPC call
    Rpc(RpcCondition),
    /// Smart-contract read
    Contract(ContractCondition),
    /// Block timestamp
    Time(TimeCondition),
    /// Boolean combination of conditions
    Compound(CompoundCondition),
}

/// Comparison applied to a call's return value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    /// `==`
    #[serde(rename = "==")]
    Eq,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `!=`
    #[serde(rename = "!=")]
    Ne,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::Eq => "==",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
            Comparator::Ne => "!=",
        };
        f.write_str(symbol)
    }
}

/// Expected result of a leaf condition's call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnValueTest {
    /// Index into a tuple return value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Comparison to apply
    pub comparator: Comparator,
    /// Target value or context variable
    pub value: ParamValue,
}

impl ReturnValueTest {
    /// Compare against a target
    pub fn new(comparator: Comparator, value: impl Into<ParamValue>) -> Self {
        Self {
            index: None,
            comparator,
            value: value.into(),
        }
    }

    /// Select one element of a tuple return value
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    fn validate_at(&self, path: &str, issues: &mut IssueCollector) {
        let path = join_path(path, "value");
        match &self.value {
            ParamValue::Variable(variable) => validate_variable(variable, &path, issues),
            ParamValue::Literal(serde_json::Value::Null) => {
                issues.push(&path, "return value target cannot be null")
            }
            ParamValue::Literal(_) => {}
        }
    }
}

impl Condition {
    /// Combine operands with `and`
    pub fn and(operands: Vec<Condition>) -> Self {
        Condition::Compound(CompoundCondition::new(CompoundOperator::And, operands))
    }

    /// Combine operands with `or`
    pub fn or(operands: Vec<Condition>) -> Self {
        Condition::Compound(CompoundCondition::new(CompoundOperator::Or, operands))
    }

    /// Wire name of this condition's kind
    pub fn condition_type(&self) -> &'static str {
        match self {
            Condition::Rpc(_) => "rpc",
            Condition::Contract(_) => "contract",
            Condition::Time(_) => "time",
            Condition::Compound(_) => "compound",
        }
    }

    /// Validate the whole tree, reporting every violation
    pub fn validate(&self) -> std::result::Result<(), ConditionError> {
        let mut issues = IssueCollector::default();
        self.validate_at("", &mut issues);
        issues.finish()
    }

    pub(crate) fn validate_at(&self, path: &str, issues: &mut IssueCollector) {
        match self {
            Condition::Rpc(condition) => condition.validate_at(path, issues),
            Condition::Contract(condition) => condition.validate_at(path, issues),
            Condition::Time(condition) => condition.validate_at(path, issues),
            Condition::Compound(condition) => condition.validate_at(path, issues),
        }
    }

    /// Apply field overrides to this condition's object form and validate the result.
    ///
    /// `overrides` must be a JSON object; its top-level keys replace the
    /// condition's fields. The receiver is left untouched.
    pub fn validate_with(&self, overrides: &serde_json::Value) -> Result<Condition> {
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(QuorumError::invalid("Condition overrides must be a JSON object"));
        };
        let mut object = match serde_json::to_value(self)? {
            serde_json::Value::Object(object) => object,
            _ => return Err(QuorumError::internal("Condition did not serialize to an object")),
        };
        for (key, value) in overrides {
            object.insert(key.clone(), value.clone());
        }
        Self::from_obj(&serde_json::Value::Object(object))
    }

    /// Validated object form
    pub fn to_obj(&self) -> Result<serde_json::Value> {
        self.validate()?;
        Ok(serde_json::to_value(self)?)
    }

    /// Parse and validate an object form
    pub fn from_obj(value: &serde_json::Value) -> Result<Condition> {
        let condition: Condition = serde_json::from_value(value.clone())
            .map_err(|e| QuorumError::validation(format!("Malformed condition: {e}")))?;
        condition.validate()?;
        Ok(condition)
    }

    /// Deterministic string form
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_obj()?)?)
    }

    /// Parse and validate the string form
    pub fn from_json(json: &str) -> Result<Condition> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| QuorumError::validation(format!("Malformed condition JSON: {e}")))?;
        Self::from_obj(&value)
    }

    /// Every distinct context variable referenced anywhere in the tree
    pub fn context_variables(&self) -> BTreeSet<ContextVariable> {
        let mut variables = BTreeSet::new();
        self.collect_variables(&mut variables);
        variables
    }

    fn collect_variables(&self, variables: &mut BTreeSet<ContextVariable>) {
        let (parameters, test) = match self {
            Condition::Rpc(c) => (&c.parameters, &c.return_value_test),
            Condition::Contract(c) => (&c.parameters, &c.return_value_test),
            Condition::Time(c) => (&c.parameters, &c.return_value_test),
            Condition::Compound(c) => {
                for operand in &c.operands {
                    operand.collect_variables(variables);
                }
                return;
            }
        };
        variables.extend(parameters.iter().filter_map(ParamValue::as_variable).cloned());
        if let Some(variable) = test.value.as_variable() {
            variables.insert(variable.clone());
        }
    }

    /// Whether the tree references the attested wallet address
    pub fn requires_signer(&self) -> bool {
        self.context_variables()
            .contains(&ContextVariable::user_address())
    }
}

impl From<RpcCondition> for Condition {
    fn from(condition: RpcCondition) -> Self {
        Condition::Rpc(condition)
    }
}

impl From<ContractCondition> for Condition {
    fn from(condition: ContractCondition) -> Self {
        Condition::Contract(condition)
    }
}

impl From<TimeCondition> for Condition {
    fn from(condition: TimeCondition) -> Self {
        Condition::Time(condition)
    }
}

impl From<CompoundCondition> for Condition {
    fn from(condition: CompoundCondition) -> Self {
        Condition::Compound(condition)
    }
}

/// Checks shared by every leaf kind
fn validate_leaf_common(
    chain: ChainId,
    parameters: &[ParamValue],
    test: &ReturnValueTest,
    path: &str,
    issues: &mut IssueCollector,
) {
    if !chain.is_supported() {
        issues.push(
            &join_path(path, "chain"),
            format!("chain {chain} is not supported"),
        );
    }
    for (i, parameter) in parameters.iter().enumerate() {
        if let ParamValue::Variable(variable) = parameter {
            let at = join_path(&join_path(path, "parameters"), &format!("[{i}]"));
            validate_variable(variable, &at, issues);
        }
    }
    test.validate_at(&join_path(path, "returnValueTest"), issues);
}

fn validate_variable(variable: &ContextVariable, path: &str, issues: &mut IssueCollector) {
    if !ContextVariable::is_well_formed(variable.as_str()) {
        issues.push(
            path,
            format!("context variable {variable} must match :[A-Za-z_][A-Za-z0-9_]*"),
        );
    }
}

/// Whether a parameter can stand for an address
fn is_address_param(parameter: &ParamValue) -> bool {
    match parameter {
        ParamValue::Variable(_) => true,
        ParamValue::Literal(serde_json::Value::String(s)) => {
            quorum_core::Address::is_valid(s)
        }
        ParamValue::Literal(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use quorum_core::Address;
    use serde_json::json;

    fn token() -> Address {
        "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap()
    }

    fn balance() -> Condition {
        ContractCondition::erc20_balance(
            ChainId::POLYGON,
            token(),
            ContextVariable::user_address(),
            Comparator::Ge,
            json!(100),
        )
        .into()
    }

    fn after_block_time() -> Condition {
        TimeCondition::block_time(ChainId::AMOY, Comparator::Gt, 1_700_000_000).into()
    }

    #[test]
    fn test_wire_form_uses_condition_type_tag() {
        let obj = after_block_time().to_obj().unwrap();
        assert_eq!(
            obj,
            json!({
                "conditionType": "time",
                "chain": 80002,
                "method": "blocktime",
                "returnValueTest": {"comparator": ">", "value": 1_700_000_000u64},
            })
        );
    }

    #[test]
    fn test_compound_round_trip_is_stable() {
        let condition = Condition::or(vec![balance(), after_block_time()]);
        let obj = condition.to_obj().unwrap();
        let parsed = Condition::from_obj(&obj).unwrap();
        assert_eq!(parsed, condition);
        assert_eq!(parsed.to_obj().unwrap(), obj);
    }

    #[test]
    fn test_compound_needs_two_operands() {
        let condition = Condition::and(vec![balance()]);
        let err = condition.validate().unwrap_err();
        assert!(err.has_issue_at("operands"));
        assert_matches!(condition.to_obj(), Err(QuorumError::Validation { .. }));
    }

    #[test]
    fn test_unknown_operator_rejected_on_parse() {
        let obj = json!({
            "conditionType": "compound",
            "operator": "xor",
            "operands": [after_block_time().to_obj().unwrap(), balance().to_obj().unwrap()],
        });
        assert_matches!(Condition::from_obj(&obj), Err(QuorumError::Validation { .. }));
    }

    #[test]
    fn test_nested_operand_errors_carry_path() {
        let bad_time = TimeCondition {
            chain: ChainId(5),
            ..TimeCondition::block_time(ChainId::AMOY, Comparator::Gt, 1)
        };
        let inner = Condition::and(vec![after_block_time(), bad_time.into()]);
        let condition = Condition::or(vec![balance(), inner]);

        let err = condition.validate().unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].path, "operands[1].operands[1].chain");
    }

    #[test]
    fn test_context_variables_collected_from_params_and_targets() {
        let rpc = RpcCondition::native_balance(
            ChainId::ETHEREUM,
            ContextVariable::new(":wallet").unwrap(),
            Comparator::Gt,
            ContextVariable::new(":minimum").unwrap(),
        );
        let condition = Condition::and(vec![rpc.into(), balance()]);

        let names: Vec<String> = condition
            .context_variables()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec![":minimum", ":userAddress", ":wallet"]);
        assert!(condition.requires_signer());
        assert!(!after_block_time().requires_signer());
    }

    #[test]
    fn test_validate_with_overrides_does_not_mutate() {
        let condition = after_block_time();
        let overridden = condition
            .validate_with(&json!({"chain": 137}))
            .unwrap();
        assert_matches!(&overridden, Condition::Time(t) if t.chain == ChainId::POLYGON);
        assert_matches!(&condition, Condition::Time(t) if t.chain == ChainId::AMOY);

        assert_matches!(
            condition.validate_with(&json!({"chain": 4})),
            Err(QuorumError::Validation { .. })
        );
        assert_matches!(
            condition.validate_with(&json!([1, 2])),
            Err(QuorumError::Invalid { .. })
        );
    }

    #[test]
    fn test_malformed_variable_in_target_is_reported() {
        let obj = json!({
            "conditionType": "time",
            "chain": 1,
            "method": "blocktime",
            "returnValueTest": {"comparator": ">=", "value": ":9lives"},
        });
        let err = Condition::from_obj(&obj).unwrap_err();
        assert_matches!(err, QuorumError::Validation { message } if message.contains("returnValueTest.value"));
    }
}
