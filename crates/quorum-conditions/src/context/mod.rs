//! Condition context resolution
//!
//! A [`ConditionContext`] turns the symbolic parameters of one condition
//! expression into concrete values. Custom parameters come from the caller;
//! `:userAddress` is resolved through a wallet attestation.
//!
//! Construction fails fast: malformed or reserved custom parameter names are
//! rejected, and so is a tree that needs `:userAddress` when no signer was
//! given. Resolution fails when any referenced parameter is still missing.

mod auth;

pub use auth::{eip712_typed_data, AuthSignatureCache, TypedSignature, WalletAuthProvider};

use crate::expression::ConditionExpression;
use crate::param::{ContextVariable, CONTEXT_PARAM_PREFIX};
use quorum_core::effects::{ChainEffects, SignerEffects};
use quorum_core::protocol::Context;
use quorum_core::serialization::to_canonical_json;
use quorum_core::{QuorumError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Resolved parameter map sent alongside conditions
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

/// Symbolic-parameter resolver for one condition expression
#[derive(Clone)]
pub struct ConditionContext {
    expression: ConditionExpression,
    chain: Arc<dyn ChainEffects>,
    signer: Option<Arc<dyn SignerEffects>>,
    auth: WalletAuthProvider,
    custom_params: BTreeMap<ContextVariable, serde_json::Value>,
}

impl ConditionContext {
    /// Start building a context for `expression`
    pub fn builder(
        expression: ConditionExpression,
        chain: Arc<dyn ChainEffects>,
    ) -> ConditionContextBuilder {
        ConditionContextBuilder {
            expression,
            chain,
            signer: None,
            auth: None,
            custom_params: Vec::new(),
        }
    }

    /// Context with no custom parameters
    pub fn from_expression(
        expression: ConditionExpression,
        chain: Arc<dyn ChainEffects>,
        signer: Option<Arc<dyn SignerEffects>>,
        auth: WalletAuthProvider,
    ) -> Result<Self> {
        let mut builder = Self::builder(expression, chain).auth_provider(auth);
        if let Some(signer) = signer {
            builder = builder.signer(signer);
        }
        builder.build()
    }

    /// Expression being resolved
    pub fn expression(&self) -> &ConditionExpression {
        &self.expression
    }

    /// Caller-supplied parameters
    pub fn custom_params(&self) -> &BTreeMap<ContextVariable, serde_json::Value> {
        &self.custom_params
    }

    /// Copy of this context with additional custom parameters.
    ///
    /// New values replace existing ones of the same name; `self` is unchanged.
    pub fn with_custom_params<I, K>(&self, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let mut next = self.clone();
        for (name, value) in params {
            let (variable, value) = check_custom_param(name.into(), value)?;
            next.custom_params.insert(variable, value);
        }
        Ok(next)
    }

    /// Same signer, attestation provider and custom parameters, resolving
    /// `expression` instead.
    ///
    /// Fails like [`ConditionContextBuilder::build`] when `expression` needs
    /// `:userAddress` and this context has no signer.
    pub fn for_expression(&self, expression: ConditionExpression) -> Result<Self> {
        if self.signer.is_none() && expression.requires_signer() {
            return Err(QuorumError::signer_required(
                "conditions reference :userAddress but no signer was provided",
            ));
        }
        Ok(Self {
            expression,
            ..self.clone()
        })
    }

    /// Resolve every referenced parameter.
    ///
    /// All custom parameters are copied into the result, including ones no
    /// condition references. Missing parameters are reported before any
    /// signature is requested.
    pub async fn to_obj(&self) -> Result<ContextMap> {
        let required = self.expression.context_variables();
        let user_address = ContextVariable::user_address();

        let missing: Vec<&str> = required
            .iter()
            .filter(|v| **v != user_address && !self.custom_params.contains_key(*v))
            .map(ContextVariable::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(QuorumError::missing_parameters(missing));
        }

        let mut resolved = ContextMap::new();
        if required.contains(&user_address) {
            let signer = self.signer.as_deref().ok_or_else(|| {
                QuorumError::signer_required("conditions reference :userAddress")
            })?;
            let attestation = self.auth.authenticate(signer, self.chain.as_ref()).await?;
            resolved.insert(
                user_address.as_str().to_string(),
                serde_json::to_value(attestation)?,
            );
        }
        for (name, value) in &self.custom_params {
            resolved.insert(name.as_str().to_string(), value.clone());
        }

        tracing::debug!(parameters = resolved.len(), "resolved condition context");
        Ok(resolved)
    }

    /// Deterministic wire form of [`Self::to_obj`]
    pub async fn to_json(&self) -> Result<Context> {
        let resolved = self.to_obj().await?;
        Ok(Context::new(to_canonical_json(&resolved)?))
    }
}

impl fmt::Debug for ConditionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionContext")
            .field("expression", &self.expression)
            .field("has_signer", &self.signer.is_some())
            .field("custom_params", &self.custom_params)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConditionContext`]
pub struct ConditionContextBuilder {
    expression: ConditionExpression,
    chain: Arc<dyn ChainEffects>,
    signer: Option<Arc<dyn SignerEffects>>,
    auth: Option<WalletAuthProvider>,
    custom_params: Vec<(String, serde_json::Value)>,
}

impl ConditionContextBuilder {
    /// Wallet used to attest `:userAddress`
    pub fn signer(mut self, signer: Arc<dyn SignerEffects>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Attestation provider; share one across contexts to share its cache
    pub fn auth_provider(mut self, auth: WalletAuthProvider) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Add one custom parameter
    pub fn custom_param(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_params.push((name.into(), value));
        self
    }

    /// Add several custom parameters
    pub fn custom_params<I, K>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        self.custom_params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Validate parameter names and the signer requirement
    pub fn build(self) -> Result<ConditionContext> {
        let mut custom_params = BTreeMap::new();
        for (name, value) in self.custom_params {
            let (variable, value) = check_custom_param(name, value)?;
            custom_params.insert(variable, value);
        }

        if self.signer.is_none() && self.expression.requires_signer() {
            return Err(QuorumError::signer_required(
                "conditions reference :userAddress but no signer was provided",
            ));
        }

        let auth = self
            .auth
            .unwrap_or_else(|| WalletAuthProvider::new(Arc::new(AuthSignatureCache::in_memory())));

        Ok(ConditionContext {
            expression: self.expression,
            chain: self.chain,
            signer: self.signer,
            auth,
            custom_params,
        })
    }
}

fn check_custom_param(
    name: String,
    value: serde_json::Value,
) -> Result<(ContextVariable, serde_json::Value)> {
    if !name.starts_with(CONTEXT_PARAM_PREFIX) {
        return Err(QuorumError::invalid(format!(
            "Custom parameter {name} must start with '{CONTEXT_PARAM_PREFIX}'"
        )));
    }
    let variable = ContextVariable::new(name)?;
    if variable.is_reserved() {
        return Err(QuorumError::invalid(format!(
            "Cannot use reserved parameter name {variable} as custom parameter"
        )));
    }
    if value.is_null() {
        return Err(QuorumError::invalid(format!(
            "Custom parameter {variable} has no value"
        )));
    }
    Ok((variable, value))
}
