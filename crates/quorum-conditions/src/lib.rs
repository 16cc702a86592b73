//! Quorum Conditions - Access Condition Language
//!
//! Conditions gate who may retrieve decryption material. This crate owns the
//! condition language and the resolution of its symbolic parameters.
//!
//! # Components
//!
//! - [`Condition`]: closed sum over rpc, contract, time and compound conditions,
//!   validated by a pure function that reports every violation with its path
//! - [`ConditionExpression`]: versioned envelope around one root condition
//! - [`ParamValue`] / [`ContextVariable`]: explicit symbolic parameters, encoded
//!   on the wire as `:`-prefixed strings
//! - [`ConditionContext`]: resolves parameters, attesting `:userAddress` through
//!   a [`WalletAuthProvider`] backed by an [`AuthSignatureCache`]

#![forbid(unsafe_code)]

/// Condition kinds and validation
pub mod condition;

/// Context resolution and wallet attestation
pub mod context;

/// Validation error reporting
pub mod errors;

/// Versioned condition envelope
pub mod expression;

/// Symbolic parameters
pub mod param;

pub use condition::{
    AbiParameter, Comparator, CompoundCondition, CompoundOperator, Condition, ContractCondition,
    FunctionAbi, ReturnValueTest, RpcCondition, StandardContractType, TimeCondition,
};
pub use context::{
    AuthSignatureCache, ConditionContext, ConditionContextBuilder, ContextMap, TypedSignature,
    WalletAuthProvider,
};
pub use errors::{ConditionError, ValidationIssue};
pub use expression::ConditionExpression;
pub use param::{ContextVariable, ParamValue, CONTEXT_PARAM_PREFIX, USER_ADDRESS_PARAM};
