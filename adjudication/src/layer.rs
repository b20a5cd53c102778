//! Layer bookkeeping shared by every evaluation layer.
//!
//! Each layer produces a [`LayerOutcome`]. A failure inside a layer never
//! escapes it: the engine records it and moves on to the next layer.

use serde::{Deserialize, Serialize};

use crate::error::{AdjudicationError, AdjudicationResult};

/// The four evaluation layers, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Rubric,
    Annotation,
    Engagement,
    Audit,
}

impl LayerKind {
    /// Which layer's verdict governs when several succeed.
    pub const GOVERNING_PRIORITY: [LayerKind; 4] = [
        LayerKind::Engagement,
        LayerKind::Annotation,
        LayerKind::Rubric,
        LayerKind::Audit,
    ];

    /// Layer number as printed in reports.
    pub fn number(self) -> &'static str {
        match self {
            Self::Rubric => "1",
            Self::Annotation => "2a",
            Self::Engagement => "2b",
            Self::Audit => "3",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Rubric => "Analytical Rubric",
            Self::Annotation => "Argument Annotation",
            Self::Engagement => "Comparative Engagement",
            Self::Audit => "Structural Audit",
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rubric => write!(f, "Rubric"),
            Self::Annotation => write!(f, "Annotation"),
            Self::Engagement => write!(f, "Engagement"),
            Self::Audit => write!(f, "Audit"),
        }
    }
}

/// Qualitative size of a win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Margin {
    Narrow,
    Clear,
    Landslide,
    Split,
    Undetermined,
}

impl std::fmt::Display for Margin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Narrow => write!(f, "narrow"),
            Self::Clear => write!(f, "clear"),
            Self::Landslide => write!(f, "landslide"),
            Self::Split => write!(f, "split"),
            Self::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Why a layer produced nothing.
#[derive(Debug)]
pub struct LayerFailure {
    pub layer: LayerKind,
    pub error: AdjudicationError,
}

/// Result of running one layer.
#[derive(Debug)]
pub enum LayerOutcome<T> {
    Succeeded(T),
    Failed(LayerFailure),
}

impl<T> LayerOutcome<T> {
    /// Convert a layer's result at the layer boundary.
    pub fn from_result(layer: LayerKind, result: AdjudicationResult<T>) -> Self {
        match result {
            Ok(value) => Self::Succeeded(value),
            Err(error) => Self::Failed(LayerFailure { layer, error }),
        }
    }

    pub fn succeeded(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    pub fn into_succeeded(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&LayerFailure> {
        match self {
            Self::Succeeded(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Serializable status line for this outcome.
    pub fn status(&self, layer: LayerKind) -> LayerStatus {
        match self {
            Self::Succeeded(_) => LayerStatus {
                layer,
                succeeded: true,
                failure_reason: None,
            },
            Self::Failed(failure) => LayerStatus {
                layer,
                succeeded: false,
                failure_reason: Some(failure.error.to_string()),
            },
        }
    }
}

/// Per-layer status recorded on the final result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStatus {
    pub layer: LayerKind,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// All-or-nothing gather: every call must succeed for the layer to proceed.
///
/// Results keep their call order. When some calls fail the layer fails with
/// [`AdjudicationError::LayerPartialFailure`] carrying the first error; when
/// every call fails it is a [`AdjudicationError::LayerTotalFailure`].
pub fn collect_all<T>(
    layer: LayerKind,
    results: Vec<AdjudicationResult<T>>,
) -> AdjudicationResult<Vec<T>> {
    let total = results.len();
    let mut values = Vec::with_capacity(total);
    let mut first_error: Option<AdjudicationError> = None;
    let mut failed = 0usize;

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) => {
                failed += 1;
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
    }

    match first_error {
        None => Ok(values),
        Some(err) if failed == total => Err(AdjudicationError::LayerTotalFailure {
            layer,
            reason: format!("all {} oracle calls failed (first: {})", total, err),
        }),
        Some(err) => Err(AdjudicationError::LayerPartialFailure {
            layer,
            failed,
            total,
            source: Box::new(err),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_failure() -> AdjudicationError {
        AdjudicationError::InvalidConfig("boom".into())
    }

    #[test]
    fn test_collect_all_keeps_order() {
        let results: Vec<AdjudicationResult<u8>> = vec![Ok(3), Ok(1), Ok(2)];
        assert_eq!(collect_all(LayerKind::Rubric, results).unwrap(), vec![3, 1, 2]);
    }

    #[test]
    fn test_collect_all_partial_failure_counts() {
        let results: Vec<AdjudicationResult<u8>> = vec![Ok(1), Err(oracle_failure()), Ok(2)];
        match collect_all(LayerKind::Engagement, results) {
            Err(AdjudicationError::LayerPartialFailure {
                layer,
                failed,
                total,
                ..
            }) => {
                assert_eq!(layer, LayerKind::Engagement);
                assert_eq!(failed, 1);
                assert_eq!(total, 3);
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_all_total_failure() {
        let results: Vec<AdjudicationResult<u8>> = vec![Err(oracle_failure()), Err(oracle_failure())];
        assert!(matches!(
            collect_all(LayerKind::Rubric, results),
            Err(AdjudicationError::LayerTotalFailure { .. })
        ));
    }

    #[test]
    fn test_outcome_status_records_reason() {
        let outcome: LayerOutcome<u8> =
            LayerOutcome::from_result(LayerKind::Audit, Err(oracle_failure()));
        let status = outcome.status(LayerKind::Audit);
        assert!(!status.succeeded);
        assert!(status.failure_reason.unwrap().contains("boom"));
        assert!(outcome.succeeded().is_none());
    }

    #[test]
    fn test_priority_starts_with_engagement() {
        assert_eq!(LayerKind::GOVERNING_PRIORITY[0], LayerKind::Engagement);
        assert_eq!(LayerKind::Engagement.number(), "2b");
        assert_eq!(Margin::Landslide.to_string(), "landslide");
    }
}
