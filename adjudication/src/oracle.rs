//! Reasoning oracle capability.
//!
//! Every layer talks to the oracle through [`ReasoningOracle`], injected at
//! construction. Each call site names a typed contract; the reply is
//! deserialized and validated here so malformed values never reach the
//! scoring arithmetic.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::{AdjudicationError, AdjudicationResult};

/// Structured failure category. The engine only cares about success vs
/// failure; oracle implementations use the kind to decide on retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleErrorKind {
    /// Endpoint could not be reached.
    Unreachable,
    /// Endpoint asked us to slow down.
    RateLimited,
    /// Credentials were refused. Retrying will not help.
    Unauthorized,
    /// Account quota is used up. Retrying will not help.
    QuotaExhausted,
    /// Reply was not parseable JSON.
    Malformed,
    /// Reply parsed but did not match the requested contract.
    NonConforming,
    /// Transient backend error (5xx, timeout).
    Transient,
}

impl OracleErrorKind {
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::Unreachable | Self::RateLimited | Self::Malformed | Self::Transient
        )
    }
}

impl std::fmt::Display for OracleErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreachable => write!(f, "unreachable"),
            Self::RateLimited => write!(f, "rate_limited"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::QuotaExhausted => write!(f, "quota_exhausted"),
            Self::Malformed => write!(f, "malformed"),
            Self::NonConforming => write!(f, "non_conforming"),
            Self::Transient => write!(f, "transient"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct OracleError {
    pub kind: OracleErrorKind,
    pub message: String,
}

impl OracleError {
    pub fn new(kind: OracleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

/// One structured-output request.
#[derive(Debug, Clone, Serialize)]
pub struct OracleRequest {
    /// Contract name, also used as the JSON schema name.
    pub contract: &'static str,
    pub prompt: String,
    /// JSON schema the reply must conform to.
    pub schema: serde_json::Value,
    /// Sampling temperature, if the call site wants a specific one.
    pub temperature: Option<f32>,
}

/// A natural-language reasoning service that returns JSON conforming to a
/// requested schema.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn complete(&self, request: &OracleRequest) -> Result<serde_json::Value, OracleError>;
}

/// A typed oracle reply.
pub trait Contract: DeserializeOwned + JsonSchema {
    const NAME: &'static str;

    /// Range and consistency checks beyond what the schema expresses.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// JSON schema for a contract.
pub fn contract_schema<C: Contract>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(C)).unwrap_or_default()
}

/// Ask the oracle for a reply of type `C`.
pub async fn invoke_structured<C: Contract>(
    oracle: &dyn ReasoningOracle,
    prompt: String,
    temperature: Option<f32>,
) -> AdjudicationResult<C> {
    let request = OracleRequest {
        contract: C::NAME,
        prompt,
        schema: contract_schema::<C>(),
        temperature,
    };
    debug!(contract = C::NAME, prompt_len = request.prompt.len(), "Invoking oracle");

    let value = oracle
        .complete(&request)
        .await
        .map_err(|source| AdjudicationError::OracleCallFailure {
            contract: C::NAME,
            source,
        })?;

    let parsed: C = serde_json::from_value(value).map_err(|e| {
        AdjudicationError::OracleCallFailure {
            contract: C::NAME,
            source: OracleError::new(OracleErrorKind::NonConforming, e.to_string()),
        }
    })?;

    parsed
        .validate()
        .map_err(|reason| AdjudicationError::OracleCallFailure {
            contract: C::NAME,
            source: OracleError::new(OracleErrorKind::NonConforming, reason),
        })?;

    Ok(parsed)
}

/// Check that `value` lies in `[lo, hi]`.
pub fn check_range(field: &str, value: f64, lo: f64, hi: f64) -> Result<(), String> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(())
    } else {
        Err(format!("{} = {} is outside [{}, {}]", field, value, lo, hi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct SingleScore {
        score: f64,
    }

    impl Contract for SingleScore {
        const NAME: &'static str = "single_score";

        fn validate(&self) -> Result<(), String> {
            check_range("score", self.score, 1.0, 10.0)
        }
    }

    struct FixedOracle(Result<serde_json::Value, OracleError>);

    #[async_trait]
    impl ReasoningOracle for FixedOracle {
        async fn complete(
            &self,
            request: &OracleRequest,
        ) -> Result<serde_json::Value, OracleError> {
            assert_eq!(request.contract, "single_score");
            assert!(request.schema.get("properties").is_some());
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_invoke_structured_parses_reply() {
        let oracle = FixedOracle(Ok(json!({"score": 7.5})));
        let reply: SingleScore = invoke_structured(&oracle, "p".into(), None).await.unwrap();
        assert_eq!(reply.score, 7.5);
    }

    #[tokio::test]
    async fn test_out_of_range_reply_is_non_conforming() {
        let oracle = FixedOracle(Ok(json!({"score": 11.0})));
        let err = invoke_structured::<SingleScore>(&oracle, "p".into(), None)
            .await
            .unwrap_err();
        match err {
            AdjudicationError::OracleCallFailure { contract, source } => {
                assert_eq!(contract, "single_score");
                assert_eq!(source.kind, OracleErrorKind::NonConforming);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_field_is_non_conforming() {
        let oracle = FixedOracle(Ok(json!({"other": 1})));
        assert!(invoke_structured::<SingleScore>(&oracle, "p".into(), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_oracle_error_passes_through() {
        let oracle = FixedOracle(Err(OracleError::new(OracleErrorKind::QuotaExhausted, "spent")));
        let err = invoke_structured::<SingleScore>(&oracle, "p".into(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota_exhausted"));
    }

    #[test]
    fn test_retriable_kinds() {
        assert!(OracleErrorKind::RateLimited.is_retriable());
        assert!(OracleErrorKind::Transient.is_retriable());
        assert!(!OracleErrorKind::QuotaExhausted.is_retriable());
        assert!(!OracleErrorKind::Unauthorized.is_retriable());
        assert!(!OracleErrorKind::NonConforming.is_retriable());
    }

    #[test]
    fn test_check_range_rejects_nan() {
        assert!(check_range("x", f64::NAN, 0.0, 1.0).is_err());
        assert!(check_range("x", 1.0, 0.0, 1.0).is_ok());
    }
}
