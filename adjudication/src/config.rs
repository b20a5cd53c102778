//! Engine configuration.
//!
//! Every knob has a default matching the production setup; callers (the
//! runner) layer TOML and environment overrides on top.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AdjudicationError, AdjudicationResult};
use crate::transcript::Side;

pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 2;
pub const DEFAULT_INTER_CALL_COOLDOWN_MS: u64 = 1000;
pub const DEFAULT_ENGAGEMENT_JUDGES: usize = 3;
pub const DEFAULT_SCORING_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_JUDGE_TEMPERATURE: f32 = 0.8;

/// Which side wins when a layer's own tie-breakers are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    FavorProposition,
    FavorOpposition,
}

impl TieBreakPolicy {
    pub fn resolve(self) -> Side {
        match self {
            Self::FavorProposition => Side::Proposition,
            Self::FavorOpposition => Side::Opposition,
        }
    }
}

/// What to do when no layer produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoVerdictPolicy {
    /// Return [`AdjudicationError::NoVerdictPossible`].
    #[default]
    Reject,
    /// Declare this side the winner with zero confidence.
    DefaultTo(Side),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjudicationConfig {
    /// Concurrent oracle calls admitted by the throttle.
    pub max_concurrent_calls: usize,
    /// How long each call keeps its slot after completing.
    pub inter_call_cooldown_ms: u64,
    /// Judges per anonymized engagement pass.
    pub engagement_judges: usize,
    /// Temperature for rubric, annotation and audit calls.
    pub scoring_temperature: f32,
    /// Temperature for engagement judges.
    pub judge_temperature: f32,
    pub rubric_tie_break: TieBreakPolicy,
    pub annotation_tie_break: TieBreakPolicy,
    pub engagement_tie_break: TieBreakPolicy,
    pub no_verdict: NoVerdictPolicy,
}

impl Default for AdjudicationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            inter_call_cooldown_ms: DEFAULT_INTER_CALL_COOLDOWN_MS,
            engagement_judges: DEFAULT_ENGAGEMENT_JUDGES,
            scoring_temperature: DEFAULT_SCORING_TEMPERATURE,
            judge_temperature: DEFAULT_JUDGE_TEMPERATURE,
            rubric_tie_break: TieBreakPolicy::FavorOpposition,
            annotation_tie_break: TieBreakPolicy::FavorOpposition,
            engagement_tie_break: TieBreakPolicy::FavorProposition,
            no_verdict: NoVerdictPolicy::Reject,
        }
    }
}

impl AdjudicationConfig {
    pub fn inter_call_cooldown(&self) -> Duration {
        Duration::from_millis(self.inter_call_cooldown_ms)
    }

    pub fn validate(&self) -> AdjudicationResult<()> {
        if self.max_concurrent_calls == 0 {
            return Err(AdjudicationError::InvalidConfig(
                "max_concurrent_calls must be at least 1".into(),
            ));
        }
        if self.engagement_judges == 0 {
            return Err(AdjudicationError::InvalidConfig(
                "engagement_judges must be at least 1".into(),
            ));
        }
        for (name, t) in [
            ("scoring_temperature", self.scoring_temperature),
            ("judge_temperature", self.judge_temperature),
        ] {
            if !(0.0..=2.0).contains(&t) {
                return Err(AdjudicationError::InvalidConfig(format!(
                    "{} = {} is outside [0, 2]",
                    name, t
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = AdjudicationConfig::default();
        assert_eq!(c.max_concurrent_calls, 2);
        assert_eq!(c.inter_call_cooldown(), Duration::from_secs(1));
        assert_eq!(c.engagement_judges, 3);
        assert_eq!(c.rubric_tie_break.resolve(), Side::Opposition);
        assert_eq!(c.engagement_tie_break.resolve(), Side::Proposition);
        assert_eq!(c.no_verdict, NoVerdictPolicy::Reject);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_zero_judges_rejected() {
        let c = AdjudicationConfig {
            engagement_judges: 0,
            ..Default::default()
        };
        assert!(matches!(
            c.validate(),
            Err(AdjudicationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: AdjudicationConfig = serde_json::from_str(
            r#"{"engagement_judges": 5, "no_verdict": {"default_to": "proposition"}}"#,
        )
        .unwrap();
        assert_eq!(c.engagement_judges, 5);
        assert_eq!(c.max_concurrent_calls, 2);
        assert_eq!(c.no_verdict, NoVerdictPolicy::DefaultTo(Side::Proposition));
    }
}
