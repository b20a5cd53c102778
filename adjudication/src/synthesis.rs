//! Cross-layer verdict synthesis.
//!
//! The governing layer is the first that succeeded in
//! [`LayerKind::GOVERNING_PRIORITY`] order. The other layers only feed the
//! agreement note and the summary; they never change the verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::annotation::scorer::AnnotationVerdict;
use crate::audit::ArgumentAudit;
use crate::config::NoVerdictPolicy;
use crate::engagement::EngagementVerdict;
use crate::error::{AdjudicationError, AdjudicationResult};
use crate::layer::{LayerKind, LayerOutcome, LayerStatus, Margin};
use crate::rubric::RubricScorecard;
use crate::transcript::Side;

/// Rubric totals must differ by more than this for a clear margin.
pub const RUBRIC_CLEAR_DIFF: f64 = 3.0;

/// The four layer outcomes handed to the synthesizer.
#[derive(Debug)]
pub struct LayerOutcomes {
    pub rubric: LayerOutcome<RubricScorecard>,
    pub annotation: LayerOutcome<AnnotationVerdict>,
    pub engagement: LayerOutcome<EngagementVerdict>,
    pub audit: LayerOutcome<ArgumentAudit>,
}

impl LayerOutcomes {
    pub fn statuses(&self) -> Vec<LayerStatus> {
        vec![
            self.rubric.status(LayerKind::Rubric),
            self.annotation.status(LayerKind::Annotation),
            self.engagement.status(LayerKind::Engagement),
            self.audit.status(LayerKind::Audit),
        ]
    }

    /// Winners of the layers that succeeded, in execution order.
    pub fn layer_winners(&self) -> Vec<LayerWinner> {
        let mut winners = Vec::new();
        if let LayerOutcome::Succeeded(r) = &self.rubric {
            winners.push(LayerWinner::new(LayerKind::Rubric, r.winner));
        }
        if let LayerOutcome::Succeeded(a) = &self.annotation {
            winners.push(LayerWinner::new(LayerKind::Annotation, a.winner));
        }
        if let LayerOutcome::Succeeded(e) = &self.engagement {
            winners.push(LayerWinner::new(LayerKind::Engagement, e.winner));
        }
        if let LayerOutcome::Succeeded(a) = &self.audit {
            winners.push(LayerWinner::new(LayerKind::Audit, a.structural_winner));
        }
        winners
    }

    /// The verdict `layer` would give, if it succeeded.
    fn signal(&self, layer: LayerKind) -> Option<Signal> {
        match layer {
            LayerKind::Engagement => self.engagement.succeeded().map(Signal::engagement),
            LayerKind::Annotation => self.annotation.succeeded().map(Signal::annotation),
            LayerKind::Rubric => self.rubric.succeeded().map(Signal::rubric),
            LayerKind::Audit => self.audit.succeeded().map(Signal::audit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerWinner {
    pub layer: LayerKind,
    pub winner: Side,
}

impl LayerWinner {
    fn new(layer: LayerKind, winner: Side) -> Self {
        Self { layer, winner }
    }
}

/// How far the succeeded layers agree. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementReport {
    pub layer_winners: Vec<LayerWinner>,
    pub unanimous: bool,
    pub note: String,
}

impl AgreementReport {
    pub fn from_winners(layer_winners: Vec<LayerWinner>) -> Self {
        let unanimous = layer_winners
            .windows(2)
            .all(|w| w[0].winner == w[1].winner);
        let listed = layer_winners
            .iter()
            .map(|w| format!("{} -> {}", w.layer, w.winner.label()))
            .collect::<Vec<_>>()
            .join(", ");

        let note = match layer_winners.len() {
            0 => "No evaluation layer produced a verdict.".to_string(),
            n if unanimous && n >= 3 => {
                format!("All {} evaluation layers agree on the outcome.", n)
            }
            _ if unanimous => format!("Partial evaluation, some layers failed: {}.", listed),
            _ => format!("Split verdict across layers: {}.", listed),
        };

        Self {
            layer_winners,
            unanimous,
            note,
        }
    }
}

/// The final division. Built once; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivisionResult {
    pub adjudication_id: Uuid,
    pub adjudicated_at: DateTime<Utc>,
    pub motion: String,
    pub winner: Side,
    pub ayes: u32,
    pub noes: u32,
    pub margin: Margin,
    pub confidence: f64,
    /// `None` when no layer succeeded and the no-verdict policy decided.
    pub governing_layer: Option<LayerKind>,
    pub summary: String,
    pub agreement: AgreementReport,
    pub layers: Vec<LayerStatus>,
    pub rubric: Option<RubricScorecard>,
    pub annotation: Option<AnnotationVerdict>,
    pub engagement: Option<EngagementVerdict>,
    pub audit: Option<ArgumentAudit>,
}

impl DivisionResult {
    pub fn failed_layers(&self) -> Vec<LayerKind> {
        self.layers
            .iter()
            .filter(|s| !s.succeeded)
            .map(|s| s.layer)
            .collect()
    }
}

/// `|a - b| / max(a, b, 1)`, capped at 1.
pub fn derived_confidence(a: f64, b: f64) -> f64 {
    ((a - b).abs() / a.max(b).max(1.0)).min(1.0)
}

/// The verdict taken from the governing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Signal {
    layer: Option<LayerKind>,
    winner: Side,
    ayes: u32,
    noes: u32,
    margin: Margin,
    confidence: f64,
}

impl Signal {
    fn engagement(e: &EngagementVerdict) -> Self {
        Self {
            layer: Some(LayerKind::Engagement),
            winner: e.winner,
            ayes: e.prop_votes,
            noes: e.opp_votes,
            margin: e.margin,
            confidence: e.mean_confidence,
        }
    }

    fn annotation(a: &AnnotationVerdict) -> Self {
        Self {
            layer: Some(LayerKind::Annotation),
            winner: a.winner,
            ayes: a.proposition.surviving,
            noes: a.opposition.surviving,
            margin: a.margin,
            confidence: derived_confidence(a.prop_score(), a.opp_score()),
        }
    }

    fn rubric(r: &RubricScorecard) -> Self {
        let (ayes, noes) = r.top_half_counts();
        let margin = if (r.prop_total - r.opp_total).abs() > RUBRIC_CLEAR_DIFF {
            Margin::Clear
        } else {
            Margin::Narrow
        };
        Self {
            layer: Some(LayerKind::Rubric),
            winner: r.winner,
            ayes,
            noes,
            margin,
            confidence: derived_confidence(r.prop_total, r.opp_total),
        }
    }

    fn audit(a: &ArgumentAudit) -> Self {
        Self {
            layer: Some(LayerKind::Audit),
            winner: a.structural_winner,
            ayes: a.prop_claims_surviving,
            noes: a.opp_claims_surviving,
            margin: Margin::Undetermined,
            confidence: derived_confidence(
                f64::from(a.prop_claims_surviving),
                f64::from(a.opp_claims_surviving),
            ),
        }
    }

    fn policy(side: Side) -> Self {
        Self {
            layer: None,
            winner: side,
            ayes: 0,
            noes: 0,
            margin: Margin::Undetermined,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VerdictSynthesizer {
    no_verdict: NoVerdictPolicy,
}

impl VerdictSynthesizer {
    pub fn new(no_verdict: NoVerdictPolicy) -> Self {
        Self { no_verdict }
    }

    pub fn synthesize(
        &self,
        motion: &str,
        outcomes: LayerOutcomes,
    ) -> AdjudicationResult<DivisionResult> {
        let governing = LayerKind::GOVERNING_PRIORITY
            .iter()
            .find_map(|&layer| outcomes.signal(layer));
        let layers = outcomes.statuses();

        let signal = match (governing, self.no_verdict) {
            (Some(signal), _) => signal,
            (None, NoVerdictPolicy::DefaultTo(side)) => {
                warn!(winner = %side, "No layer succeeded; applying default-winner policy");
                Signal::policy(side)
            }
            (None, NoVerdictPolicy::Reject) => {
                warn!("No layer succeeded; no verdict possible");
                return Err(AdjudicationError::NoVerdictPossible { layers });
            }
        };

        let agreement = AgreementReport::from_winners(outcomes.layer_winners());
        let summary = build_summary(&signal, &agreement, &outcomes, &layers);

        info!(
            winner = %signal.winner,
            margin = %signal.margin,
            confidence = signal.confidence,
            governing = ?signal.layer,
            "Verdict synthesized"
        );

        Ok(DivisionResult {
            adjudication_id: Uuid::new_v4(),
            adjudicated_at: Utc::now(),
            motion: motion.to_string(),
            winner: signal.winner,
            ayes: signal.ayes,
            noes: signal.noes,
            margin: signal.margin,
            confidence: signal.confidence,
            governing_layer: signal.layer,
            summary,
            agreement,
            layers,
            rubric: outcomes.rubric.into_succeeded(),
            annotation: outcomes.annotation.into_succeeded(),
            engagement: outcomes.engagement.into_succeeded(),
            audit: outcomes.audit.into_succeeded(),
        })
    }
}

fn build_summary(
    signal: &Signal,
    agreement: &AgreementReport,
    outcomes: &LayerOutcomes,
    layers: &[LayerStatus],
) -> String {
    let mut parts = vec![format!(
        "The {} wins by a {} margin.",
        signal.winner.label(),
        signal.margin
    )];
    if signal.layer.is_none() {
        parts.push(format!(
            "No evaluation layer succeeded; {} is awarded by the default-winner policy.",
            signal.winner.label()
        ));
    }
    parts.push(agreement.note.clone());

    let tie_note = |layer: LayerKind, winner: Side| {
        format!(
            "{} tied; {} awarded by tie-break policy.",
            layer,
            winner.label()
        )
    };
    if let Some(e) = outcomes.engagement.succeeded() {
        parts.push(format!(
            "Engagement verdict: Prop {} - Opp {} ({}).",
            e.prop_votes,
            e.opp_votes,
            if e.pass_agreement {
                "passes agree"
            } else {
                "passes DISAGREE"
            }
        ));
        if e.decided_by_policy {
            parts.push(tie_note(LayerKind::Engagement, e.winner));
        }
    }
    if let Some(a) = outcomes.annotation.succeeded() {
        parts.push(format!(
            "Mechanical score: Prop {:.1} vs Opp {:.1}.",
            a.prop_score(),
            a.opp_score()
        ));
        if a.decided_by_policy {
            parts.push(tie_note(LayerKind::Annotation, a.winner));
        }
    }
    if let Some(r) = outcomes.rubric.succeeded() {
        if r.decided_by_policy {
            parts.push(tie_note(LayerKind::Rubric, r.winner));
        }
        if let Some(best) = r.best_speaker() {
            parts.push(format!(
                "Most effective speaker: {} ({:.1}/10).",
                best.speaker, best.overall
            ));
        }
        if let Some(weakest) = r.weakest_speaker() {
            parts.push(format!(
                "Least effective speaker: {} ({:.1}/10).",
                weakest.speaker, weakest.overall
            ));
        }
    }
    if let Some(a) = outcomes.audit.succeeded() {
        parts.push(format!(
            "Structural audit: {} Prop claims and {} Opp claims survive.",
            a.prop_claims_surviving, a.opp_claims_surviving
        ));
    }

    let failed: Vec<String> = layers
        .iter()
        .filter(|s| !s.succeeded)
        .map(|s| s.layer.to_string())
        .collect();
    if !failed.is_empty() {
        parts.push(format!("Failed layers: {}.", failed.join(", ")));
    }
    parts.join(" ")
}
