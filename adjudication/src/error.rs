//! Adjudication error taxonomy.
//!
//! Errors raised inside a layer are caught at the layer boundary and turned
//! into [`LayerOutcome::Failed`](crate::layer::LayerOutcome). Only
//! [`AdjudicationError::NoVerdictPossible`] and input validation errors ever
//! reach the caller of [`Adjudicator::adjudicate`](crate::engine::Adjudicator).

use thiserror::Error;

use crate::layer::{LayerKind, LayerStatus};
use crate::oracle::OracleError;

/// Unified error type for the adjudication engine.
#[derive(Debug, Error)]
pub enum AdjudicationError {
    /// A single oracle call failed: unreachable, quota exhausted, or the reply
    /// did not conform to the requested contract.
    #[error("Oracle call '{contract}' failed: {source}")]
    OracleCallFailure {
        contract: &'static str,
        #[source]
        source: OracleError,
    },

    /// Some (but not all) of a multi-call layer's oracle calls failed.
    #[error("{layer} layer: {failed} of {total} oracle calls failed (first: {source})")]
    LayerPartialFailure {
        layer: LayerKind,
        failed: usize,
        total: usize,
        #[source]
        source: Box<AdjudicationError>,
    },

    /// The layer as a whole could not produce a result.
    #[error("{layer} layer failed: {reason}")]
    LayerTotalFailure { layer: LayerKind, reason: String },

    /// Recalibration did not produce a usable ranking. Never fatal: the rubric
    /// layer keeps its initial scores.
    #[error("Recalibration fell back to initial scores: {reason}")]
    RecalibrationFallback { reason: String },

    /// Every evaluation layer failed and the configured policy refuses to
    /// invent a winner. Carries each layer's status and failure reason.
    #[error(
        "No verdict possible: every evaluation layer failed ({})",
        describe_failures(.layers)
    )]
    NoVerdictPossible { layers: Vec<LayerStatus> },

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn describe_failures(layers: &[LayerStatus]) -> String {
    layers
        .iter()
        .map(|s| {
            format!(
                "{}: {}",
                s.layer,
                s.failure_reason.as_deref().unwrap_or("no result")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for adjudication operations.
pub type AdjudicationResult<T> = Result<T, AdjudicationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleError, OracleErrorKind};

    #[test]
    fn test_partial_failure_display_names_layer_and_counts() {
        let err = AdjudicationError::LayerPartialFailure {
            layer: LayerKind::Rubric,
            failed: 2,
            total: 6,
            source: Box::new(AdjudicationError::OracleCallFailure {
                contract: "speech_score",
                source: OracleError::new(OracleErrorKind::RateLimited, "429"),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("Rubric"));
        assert!(text.contains("2 of 6"));
        assert!(text.contains("speech_score"));
    }

    #[test]
    fn test_no_verdict_lists_every_layer_reason() {
        let err = AdjudicationError::NoVerdictPossible {
            layers: vec![
                LayerStatus {
                    layer: LayerKind::Rubric,
                    succeeded: false,
                    failure_reason: Some("quota exhausted".into()),
                },
                LayerStatus {
                    layer: LayerKind::Audit,
                    succeeded: false,
                    failure_reason: Some("backend 503".into()),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "No verdict possible: every evaluation layer failed \
             (Rubric: quota exhausted; Audit: backend 503)"
        );
        assert!(matches!(
            err,
            AdjudicationError::NoVerdictPossible { ref layers } if layers.len() == 2
        ));
    }
}
