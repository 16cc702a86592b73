//! Smart-contract conditions
//!
//! A contract call is described either by a standard contract type, which
//! implies the ABI, or by an explicit function ABI. Exactly one of the two
//! must be present.

use super::{is_address_param, validate_leaf_common, Comparator, ReturnValueTest};
use crate::errors::{join_path, IssueCollector};
use crate::param::{ContextVariable, ParamValue};
use quorum_core::types::ChainId;
use quorum_core::Address;
use serde::{Deserialize, Serialize};

/// Token standards with a built-in ABI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardContractType {
    /// Fungible token
    #[serde(rename = "ERC20")]
    Erc20,
    /// Non-fungible token
    #[serde(rename = "ERC721")]
    Erc721,
}

impl StandardContractType {
    /// Read methods a condition may call on this standard
    pub fn methods(&self) -> &'static [&'static str] {
        match self {
            StandardContractType::Erc20 => &["balanceOf"],
            StandardContractType::Erc721 => &["balanceOf", "ownerOf"],
        }
    }
}

/// One ABI input or output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiParameter {
    /// Parameter name
    #[serde(default)]
    pub name: String,
    /// Solidity type
    #[serde(rename = "type")]
    pub kind: String,
    /// Compiler-internal type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_type: Option<String>,
}

/// Explicit ABI of the called function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionAbi {
    /// Function name; must equal the condition's method
    pub name: String,
    /// ABI entry kind; must be `function`
    #[serde(rename = "type")]
    pub kind: String,
    /// Inputs, one per condition parameter
    #[serde(default)]
    pub inputs: Vec<AbiParameter>,
    /// Outputs
    #[serde(default)]
    pub outputs: Vec<AbiParameter>,
    /// `view` or `pure` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_mutability: Option<String>,
}

/// Condition over a contract read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCondition {
    /// Chain hosting the contract
    pub chain: ChainId,
    /// `0x`-prefixed contract address
    pub contract_address: String,
    /// Called method
    pub method: String,
    /// Call arguments
    #[serde(default)]
    pub parameters: Vec<ParamValue>,
    /// Built-in ABI selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_contract_type: Option<StandardContractType>,
    /// Explicit ABI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_abi: Option<FunctionAbi>,
    /// Expected result
    pub return_value_test: ReturnValueTest,
}

impl ContractCondition {
    /// ERC20 `balanceOf(owner)` compared against `amount`
    pub fn erc20_balance(
        chain: ChainId,
        contract: Address,
        owner: impl Into<ParamValue>,
        comparator: Comparator,
        amount: impl Into<ParamValue>,
    ) -> Self {
        Self {
            chain,
            contract_address: contract.to_hex(),
            method: "balanceOf".to_string(),
            parameters: vec![owner.into()],
            standard_contract_type: Some(StandardContractType::Erc20),
            function_abi: None,
            return_value_test: ReturnValueTest::new(comparator, amount),
        }
    }

    /// ERC721 `ownerOf(token_id)` equals the attested caller
    pub fn erc721_ownership(
        chain: ChainId,
        contract: Address,
        token_id: impl Into<ParamValue>,
    ) -> Self {
        Self {
            chain,
            contract_address: contract.to_hex(),
            method: "ownerOf".to_string(),
            parameters: vec![token_id.into()],
            standard_contract_type: Some(StandardContractType::Erc721),
            function_abi: None,
            return_value_test: ReturnValueTest::new(
                Comparator::Eq,
                ContextVariable::user_address(),
            ),
        }
    }

    /// Call through an explicit ABI
    pub fn with_abi(
        chain: ChainId,
        contract: Address,
        abi: FunctionAbi,
        parameters: Vec<ParamValue>,
        return_value_test: ReturnValueTest,
    ) -> Self {
        Self {
            chain,
            contract_address: contract.to_hex(),
            method: abi.name.clone(),
            parameters,
            standard_contract_type: None,
            function_abi: Some(abi),
            return_value_test,
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
        if !Address::is_valid(&self.contract_address) {
            issues.push(
                &join_path(path, "contractAddress"),
                format!("invalid contract address {}", self.contract_address),
            );
        }

        match (&self.standard_contract_type, &self.function_abi) {
            (Some(standard), None) => self.validate_standard(*standard, path, issues),
            (None, Some(abi)) => self.validate_abi(abi, path, issues),
            (Some(_), Some(_)) => issues.push(
                path,
                "standardContractType and functionAbi are mutually exclusive",
            ),
            (None, None) => issues.push(
                path,
                "one of standardContractType or functionAbi is required",
            ),
        }
    }

    fn validate_standard(
        &self,
        standard: StandardContractType,
        path: &str,
        issues: &mut IssueCollector,
    ) {
        if !standard.methods().contains(&self.method.as_str()) {
            issues.push(
                &join_path(path, "method"),
                format!(
                    "{} is not a supported method for {standard:?}",
                    self.method
                ),
            );
            return;
        }
        let parameters_path = join_path(path, "parameters");
        if self.parameters.len() != 1 {
            issues.push(
                &parameters_path,
                format!("{} takes 1 parameter, got {}", self.method, self.parameters.len()),
            );
        } else if self.method == "balanceOf" && !is_address_param(&self.parameters[0]) {
            issues.push(
                &join_path(&parameters_path, "[0]"),
                "expected an address or context variable",
            );
        }
    }

    fn validate_abi(&self, abi: &FunctionAbi, path: &str, issues: &mut IssueCollector) {
        let abi_path = join_path(path, "functionAbi");
        if abi.name != self.method {
            issues.push(
                &join_path(&abi_path, "name"),
                format!("ABI name {} does not match method {}", abi.name, self.method),
            );
        }
        if abi.kind != "function" {
            issues.push(
                &join_path(&abi_path, "type"),
                format!("expected function, got {}", abi.kind),
            );
        }
        if let Some(mutability) = &abi.state_mutability {
            if mutability != "view" && mutability != "pure" {
                issues.push(
                    &join_path(&abi_path, "stateMutability"),
                    format!("only view or pure functions can be called, got {mutability}"),
                );
            }
        }
        if abi.inputs.len() != self.parameters.len() {
            issues.push(
                &join_path(&abi_path, "inputs"),
                format!(
                    "ABI declares {} input(s) but {} parameter(s) were given",
                    abi.inputs.len(),
                    self.parameters.len()
                ),
            );
        }
    }
}
