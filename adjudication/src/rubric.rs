//! Layer 1: analytical rubric.
//!
//! Every speech is scored independently on five dimensions plus a weighted
//! overall. Oracle scores tend to cluster; when they do, a single
//! recalibration call force-ranks the speeches and reassigns the scores.
//! A failed or incomplete recalibration keeps the initial scores.

use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TieBreakPolicy;
use crate::error::{AdjudicationError, AdjudicationResult};
use crate::layer::{collect_all, LayerKind};
use crate::oracle::{check_range, invoke_structured, Contract, ReasoningOracle};
use crate::prompts;
use crate::throttle::ThrottledInvoker;
use crate::transcript::{Side, Speech, Transcript};

/// Overall-score spread below which scores count as clustered.
pub const CLUSTER_SPREAD_THRESHOLD: f64 = 1.5;
/// Distinct integer overall values at or below which scores count as clustered.
pub const CLUSTER_UNIQUE_INTS: usize = 2;

// ── Oracle contracts ────────────────────────────────────────────────

/// Reply for one speech.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SpeechScoreResponse {
    pub argument_strength: f64,
    pub rebuttal_quality: f64,
    pub evidence_grounding: f64,
    pub rhetorical_effectiveness: f64,
    pub persona_fidelity: f64,
    /// Weighted overall, not a plain average.
    pub overall: f64,
    pub rationale: String,
}

impl SpeechScoreResponse {
    fn dimensions(&self) -> [(&'static str, f64); 6] {
        [
            ("argument_strength", self.argument_strength),
            ("rebuttal_quality", self.rebuttal_quality),
            ("evidence_grounding", self.evidence_grounding),
            ("rhetorical_effectiveness", self.rhetorical_effectiveness),
            ("persona_fidelity", self.persona_fidelity),
            ("overall", self.overall),
        ]
    }
}

impl Contract for SpeechScoreResponse {
    const NAME: &'static str = "speech_score";

    fn validate(&self) -> Result<(), String> {
        self.dimensions()
            .iter()
            .try_for_each(|(name, v)| check_range(name, *v, 1.0, 10.0))
    }
}

/// One speech's place in the forced ranking.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecalibratedRanking {
    pub speaker_name: String,
    /// 1 = best.
    pub rank: u8,
    pub argument_strength: f64,
    pub rebuttal_quality: f64,
    pub evidence_grounding: f64,
    pub rhetorical_effectiveness: f64,
    pub persona_fidelity: f64,
    pub overall: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RecalibrationResponse {
    pub rankings: Vec<RecalibratedRanking>,
}

impl Contract for RecalibrationResponse {
    const NAME: &'static str = "recalibration";

    fn validate(&self) -> Result<(), String> {
        for r in &self.rankings {
            for (name, v) in [
                ("argument_strength", r.argument_strength),
                ("rebuttal_quality", r.rebuttal_quality),
                ("evidence_grounding", r.evidence_grounding),
                ("rhetorical_effectiveness", r.rhetorical_effectiveness),
                ("persona_fidelity", r.persona_fidelity),
                ("overall", r.overall),
            ] {
                check_range(name, v, 1.0, 10.0)?;
            }
        }
        Ok(())
    }
}

// ── Scores ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechScore {
    pub speaker: String,
    pub side: Side,
    pub position: u8,
    pub argument_strength: f64,
    pub rebuttal_quality: f64,
    pub evidence_grounding: f64,
    pub rhetorical_effectiveness: f64,
    pub persona_fidelity: f64,
    pub overall: f64,
    pub rationale: String,
    /// Forced rank, present only after recalibration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u8>,
}

impl SpeechScore {
    pub fn from_response(speech: &Speech, r: SpeechScoreResponse) -> Self {
        Self {
            speaker: speech.speaker.clone(),
            side: speech.side,
            position: speech.position,
            argument_strength: r.argument_strength,
            rebuttal_quality: r.rebuttal_quality,
            evidence_grounding: r.evidence_grounding,
            rhetorical_effectiveness: r.rhetorical_effectiveness,
            persona_fidelity: r.persona_fidelity,
            overall: r.overall,
            rationale: r.rationale,
            rank: None,
        }
    }

    /// Argument strength plus rebuttal quality, the first rubric tie-breaker.
    pub fn debate_subtotal(&self) -> f64 {
        self.argument_strength + self.rebuttal_quality
    }
}

/// How tightly the overall scores are bunched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub spread: f64,
    pub unique_ints: usize,
}

impl ClusterStats {
    pub fn of(overalls: &[f64]) -> Self {
        if overalls.is_empty() {
            return Self {
                spread: 0.0,
                unique_ints: 0,
            };
        }
        let max = overalls.iter().copied().fold(f64::MIN, f64::max);
        let min = overalls.iter().copied().fold(f64::MAX, f64::min);
        let unique_ints = overalls
            .iter()
            .map(|v| v.floor() as i64)
            .collect::<HashSet<_>>()
            .len();
        Self {
            spread: max - min,
            unique_ints,
        }
    }

    pub fn is_clustered(&self) -> bool {
        self.spread < CLUSTER_SPREAD_THRESHOLD || self.unique_ints <= CLUSTER_UNIQUE_INTS
    }
}

/// Replace initial scores with a forced ranking.
///
/// Accepted only if every speech appears exactly once and ranks are unique
/// and within `1..=n`. Speaker names match case-insensitively. The output
/// keeps speaking order.
pub fn apply_recalibration(
    initial: &[SpeechScore],
    response: &RecalibrationResponse,
) -> Result<Vec<SpeechScore>, String> {
    let n = initial.len();
    if response.rankings.len() != n {
        return Err(format!(
            "expected {} rankings, got {}",
            n,
            response.rankings.len()
        ));
    }

    let mut recalibrated: Vec<Option<SpeechScore>> = vec![None; n];
    let mut ranks = HashSet::new();
    for r in &response.rankings {
        if r.rank == 0 || usize::from(r.rank) > n {
            return Err(format!("rank {} for '{}' is outside 1..={}", r.rank, r.speaker_name, n));
        }
        if !ranks.insert(r.rank) {
            return Err(format!("rank {} assigned twice", r.rank));
        }
        let idx = initial
            .iter()
            .position(|s| s.speaker.trim().eq_ignore_ascii_case(r.speaker_name.trim()))
            .ok_or_else(|| format!("unknown speaker '{}'", r.speaker_name))?;
        if recalibrated[idx].is_some() {
            return Err(format!("speaker '{}' ranked twice", r.speaker_name));
        }
        let base = &initial[idx];
        recalibrated[idx] = Some(SpeechScore {
            speaker: base.speaker.clone(),
            side: base.side,
            position: base.position,
            argument_strength: r.argument_strength,
            rebuttal_quality: r.rebuttal_quality,
            evidence_grounding: r.evidence_grounding,
            rhetorical_effectiveness: r.rhetorical_effectiveness,
            persona_fidelity: r.persona_fidelity,
            overall: r.overall,
            rationale: r.rationale.clone(),
            rank: Some(r.rank),
        });
    }

    // Counts match and no speaker repeats, so every slot is filled.
    recalibrated
        .into_iter()
        .map(|s| s.ok_or_else(|| "incomplete ranking".to_string()))
        .collect()
}

// ── Scorecard ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricScorecard {
    /// Final scores in speaking order.
    pub scores: Vec<SpeechScore>,
    pub prop_total: f64,
    pub opp_total: f64,
    pub winner: Side,
    /// Set when both the totals and the debate subtotals tied.
    pub decided_by_policy: bool,
    pub initial_stats: ClusterStats,
    pub recalibrated: bool,
}

impl RubricScorecard {
    /// Aggregate final scores into side totals and a winner.
    pub fn tally(
        scores: Vec<SpeechScore>,
        initial_stats: ClusterStats,
        recalibrated: bool,
        tie_break: TieBreakPolicy,
    ) -> Self {
        let total = |side: Side| -> f64 {
            scores
                .iter()
                .filter(|s| s.side == side)
                .map(|s| s.overall)
                .sum()
        };
        let subtotal = |side: Side| -> f64 {
            scores
                .iter()
                .filter(|s| s.side == side)
                .map(SpeechScore::debate_subtotal)
                .sum()
        };
        let prop_total = total(Side::Proposition);
        let opp_total = total(Side::Opposition);

        let (winner, decided_by_policy) = if prop_total > opp_total {
            (Side::Proposition, false)
        } else if opp_total > prop_total {
            (Side::Opposition, false)
        } else {
            let prop_sub = subtotal(Side::Proposition);
            let opp_sub = subtotal(Side::Opposition);
            if prop_sub > opp_sub {
                (Side::Proposition, false)
            } else if opp_sub > prop_sub {
                (Side::Opposition, false)
            } else {
                (tie_break.resolve(), true)
            }
        };

        Self {
            scores,
            prop_total,
            opp_total,
            winner,
            decided_by_policy,
            initial_stats,
            recalibrated,
        }
    }

    /// Highest overall; earliest speaker on ties.
    pub fn best_speaker(&self) -> Option<&SpeechScore> {
        self.scores
            .iter()
            .reduce(|best, s| if s.overall > best.overall { s } else { best })
    }

    /// Lowest overall; earliest speaker on ties.
    pub fn weakest_speaker(&self) -> Option<&SpeechScore> {
        self.scores
            .iter()
            .reduce(|worst, s| if s.overall < worst.overall { s } else { worst })
    }

    /// Speeches per side in the top half by overall, as (prop, opp).
    pub fn top_half_counts(&self) -> (u32, u32) {
        let mut ranked: Vec<&SpeechScore> = self.scores.iter().collect();
        ranked.sort_by(|a, b| {
            b.overall
                .total_cmp(&a.overall)
                .then(a.position.cmp(&b.position))
        });
        let half = ranked.len() / 2;
        ranked.iter().take(half).fold((0, 0), |(p, o), s| match s.side {
            Side::Proposition => (p + 1, o),
            Side::Opposition => (p, o + 1),
        })
    }
}

// ── Layer ───────────────────────────────────────────────────────────

pub struct RubricLayer {
    oracle: Arc<dyn ReasoningOracle>,
    invoker: ThrottledInvoker,
    temperature: f32,
    tie_break: TieBreakPolicy,
}

impl RubricLayer {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        invoker: ThrottledInvoker,
        temperature: f32,
        tie_break: TieBreakPolicy,
    ) -> Self {
        Self {
            oracle,
            invoker,
            temperature,
            tie_break,
        }
    }

    pub async fn evaluate(&self, transcript: &Transcript) -> AdjudicationResult<RubricScorecard> {
        let rendered = transcript.render();
        let speeches = transcript.ordered_speeches();
        info!(speeches = speeches.len(), "Layer 1: scoring speeches");

        let oracle = self.oracle.as_ref();
        let calls = speeches.iter().map(|speech| {
            let prompt = prompts::speech_score(transcript, &rendered, speech);
            async move {
                invoke_structured::<SpeechScoreResponse>(oracle, prompt, Some(self.temperature))
                    .await
                    .map(|r| SpeechScore::from_response(speech, r))
            }
        });
        let initial = collect_all(LayerKind::Rubric, self.invoker.gather(calls).await)?;

        let overalls: Vec<f64> = initial.iter().map(|s| s.overall).collect();
        let stats = ClusterStats::of(&overalls);

        let (scores, recalibrated) = if stats.is_clustered() {
            info!(
                spread = stats.spread,
                unique_ints = stats.unique_ints,
                "Layer 1: scores clustered, recalibrating"
            );
            match self.recalibrate(transcript, &rendered, &initial).await {
                Ok(scores) => (scores, true),
                Err(e) => {
                    warn!(error = %e, "Layer 1: keeping initial scores");
                    (initial, false)
                }
            }
        } else {
            (initial, false)
        };

        let card = RubricScorecard::tally(scores, stats, recalibrated, self.tie_break);
        info!(
            prop_total = card.prop_total,
            opp_total = card.opp_total,
            winner = %card.winner,
            recalibrated = card.recalibrated,
            "Layer 1 complete"
        );
        Ok(card)
    }

    async fn recalibrate(
        &self,
        transcript: &Transcript,
        rendered: &str,
        initial: &[SpeechScore],
    ) -> AdjudicationResult<Vec<SpeechScore>> {
        let prompt = prompts::recalibration(transcript, rendered, initial);
        let response = self
            .invoker
            .run(invoke_structured::<RecalibrationResponse>(
                self.oracle.as_ref(),
                prompt,
                Some(self.temperature),
            ))
            .await
            .map_err(|e| AdjudicationError::RecalibrationFallback {
                reason: e.to_string(),
            })?;
        apply_recalibration(initial, &response)
            .map_err(|reason| AdjudicationError::RecalibrationFallback { reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(speaker: &str, side: Side, position: u8, overall: f64) -> SpeechScore {
        SpeechScore {
            speaker: speaker.into(),
            side,
            position,
            argument_strength: overall,
            rebuttal_quality: overall,
            evidence_grounding: overall,
            rhetorical_effectiveness: overall,
            persona_fidelity: overall,
            overall,
            rationale: String::new(),
            rank: None,
        }
    }

    fn ranking(name: &str, rank: u8, overall: f64) -> RecalibratedRanking {
        RecalibratedRanking {
            speaker_name: name.into(),
            rank,
            argument_strength: overall,
            rebuttal_quality: overall,
            evidence_grounding: overall,
            rhetorical_effectiveness: overall,
            persona_fidelity: overall,
            overall,
            rationale: "comparative".into(),
        }
    }

    fn six(overalls: [f64; 6]) -> Vec<SpeechScore> {
        let names = ["A", "B", "C", "D", "E", "F"];
        overalls
            .iter()
            .enumerate()
            .map(|(i, o)| {
                let side = if i % 2 == 0 { Side::Proposition } else { Side::Opposition };
                score(names[i], side, i as u8 + 1, *o)
            })
            .collect()
    }

    // ── Clustering trigger ──────────────────────────────────────────

    #[test]
    fn test_tight_scores_trigger_recalibration() {
        let stats = ClusterStats::of(&[7.0, 7.1, 7.2, 7.3, 7.0, 7.1]);
        assert!(stats.spread < 1.5);
        assert_eq!(stats.unique_ints, 1);
        assert!(stats.is_clustered());
    }

    #[test]
    fn test_spread_scores_do_not_trigger() {
        let stats = ClusterStats::of(&[3.0, 9.0, 4.0, 8.0, 5.0, 2.0]);
        assert_eq!(stats.spread, 7.0);
        assert_eq!(stats.unique_ints, 6);
        assert!(!stats.is_clustered());
    }

    #[test]
    fn test_two_integer_values_trigger_despite_spread() {
        let stats = ClusterStats::of(&[6.0, 6.9, 8.0, 8.9, 6.5, 8.5]);
        assert!(stats.spread >= 1.5);
        assert!(stats.is_clustered());
    }

    // ── Recalibration acceptance ────────────────────────────────────

    #[test]
    fn test_complete_ranking_is_applied_in_speaking_order() {
        let initial = six([7.0; 6]);
        let response = RecalibrationResponse {
            rankings: vec![
                ranking("F", 1, 9.0),
                ranking("a", 6, 4.0),
                ranking("B", 2, 8.0),
                ranking("C", 3, 7.0),
                ranking("D", 4, 6.0),
                ranking("E", 5, 5.0),
            ],
        };
        let out = apply_recalibration(&initial, &response).unwrap();
        assert_eq!(out[0].speaker, "A");
        assert_eq!(out[0].overall, 4.0);
        assert_eq!(out[0].rank, Some(6));
        assert_eq!(out[5].overall, 9.0);
    }

    #[test]
    fn test_missing_ranking_is_rejected() {
        let initial = six([7.0; 6]);
        let response = RecalibrationResponse {
            rankings: (0..5)
                .map(|i| ranking(["A", "B", "C", "D", "E"][i], i as u8 + 1, 8.0 - i as f64))
                .collect(),
        };
        assert!(apply_recalibration(&initial, &response).is_err());
    }

    #[test]
    fn test_duplicate_rank_is_rejected() {
        let initial = six([7.0; 6]);
        let mut rankings: Vec<_> = ["A", "B", "C", "D", "E", "F"]
            .iter()
            .enumerate()
            .map(|(i, n)| ranking(n, i as u8 + 1, 9.0 - i as f64))
            .collect();
        rankings[5].rank = 1;
        let err = apply_recalibration(&initial, &RecalibrationResponse { rankings }).unwrap_err();
        assert!(err.contains("assigned twice"));
    }

    // ── Aggregation ─────────────────────────────────────────────────

    #[test]
    fn test_higher_total_wins() {
        let card = RubricScorecard::tally(
            six([8.0, 6.0, 8.0, 6.0, 8.0, 6.0]),
            ClusterStats::of(&[]),
            false,
            TieBreakPolicy::FavorOpposition,
        );
        assert_eq!(card.prop_total, 24.0);
        assert_eq!(card.opp_total, 18.0);
        assert_eq!(card.winner, Side::Proposition);
        assert!(!card.decided_by_policy);
    }

    #[test]
    fn test_total_tie_broken_by_debate_subtotal() {
        let mut scores = six([7.0; 6]);
        scores[1].argument_strength = 9.0;
        let card = RubricScorecard::tally(
            scores,
            ClusterStats::of(&[]),
            false,
            TieBreakPolicy::FavorProposition,
        );
        assert_eq!(card.winner, Side::Opposition);
        assert!(!card.decided_by_policy);
    }

    #[test]
    fn test_full_tie_uses_policy() {
        let card = RubricScorecard::tally(
            six([7.0; 6]),
            ClusterStats::of(&[]),
            false,
            TieBreakPolicy::FavorOpposition,
        );
        assert_eq!(card.winner, Side::Opposition);
        assert!(card.decided_by_policy);
    }

    #[test]
    fn test_best_weakest_and_top_half() {
        let card = RubricScorecard::tally(
            six([8.5, 6.0, 7.0, 9.0, 5.0, 4.0]),
            ClusterStats::of(&[]),
            false,
            TieBreakPolicy::FavorOpposition,
        );
        assert_eq!(card.best_speaker().unwrap().speaker, "D");
        assert_eq!(card.weakest_speaker().unwrap().speaker, "F");
        // Top three: D (opp 9.0), A (prop 8.5), C (prop 7.0).
        assert_eq!(card.top_half_counts(), (2, 1));
    }
}
