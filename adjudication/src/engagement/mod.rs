//! Layer 2b: anonymized comparative engagement, the primary signal.
//!
//! Judges see the debate with names and sides replaced by Team A / Team B.
//! The debate is judged twice with the labels swapped, so a judge that
//! prefers a label (or a speaking position) cancels itself out.

pub mod anonymize;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::TieBreakPolicy;
use crate::error::AdjudicationResult;
use crate::layer::{collect_all, LayerKind, Margin};
use crate::oracle::{check_range, invoke_structured, Contract, ReasoningOracle};
use crate::prompts;
use crate::throttle::ThrottledInvoker;
use crate::transcript::{Side, Transcript};

use anonymize::{Anonymizer, Team, TeamAssignment};

/// Winning vote share at or above which the margin is a landslide.
pub const LANDSLIDE_SHARE: f64 = 0.83;
/// Winning vote share at or above which the margin is clear.
pub const CLEAR_SHARE: f64 = 0.67;

/// One judge's comparative vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngagementVote {
    pub better_team: Team,
    pub engagement_quality_a: f64,
    pub engagement_quality_b: f64,
    pub strongest_argument_a: String,
    pub strongest_argument_b: String,
    pub best_rebuttal: String,
    pub decisive_moment: String,
    /// Must cite specific arguments and exchanges.
    pub key_reason: String,
    pub confidence: f64,
}

impl Contract for EngagementVote {
    const NAME: &'static str = "engagement_vote";

    fn validate(&self) -> Result<(), String> {
        check_range("engagement_quality_a", self.engagement_quality_a, 1.0, 10.0)?;
        check_range("engagement_quality_b", self.engagement_quality_b, 1.0, 10.0)?;
        check_range("confidence", self.confidence, 0.0, 1.0)?;
        if self.key_reason.trim().is_empty() {
            return Err("key_reason is empty".into());
        }
        Ok(())
    }
}

/// A vote mapped back to the real side it favours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedVote {
    /// 1 or 2.
    pub pass: u8,
    pub assignment: TeamAssignment,
    pub side: Side,
    pub vote: EngagementVote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementVerdict {
    pub votes: Vec<MappedVote>,
    pub prop_votes: u32,
    pub opp_votes: u32,
    pub winner: Side,
    /// Set when the vote was tied and the policy picked the winner.
    pub decided_by_policy: bool,
    pub margin: Margin,
    pub mean_confidence: f64,
    /// Majority winner of each pass, in pass order.
    pub pass_winners: Vec<Side>,
    pub pass_agreement: bool,
    pub summary: String,
}

/// Margin from the winning share of votes.
pub fn classify_vote_margin(prop_votes: u32, opp_votes: u32) -> Margin {
    if prop_votes == opp_votes {
        return Margin::Split;
    }
    let total = f64::from(prop_votes + opp_votes);
    let share = f64::from(prop_votes.max(opp_votes)) / total;
    if share >= LANDSLIDE_SHARE {
        Margin::Landslide
    } else if share >= CLEAR_SHARE {
        Margin::Clear
    } else {
        Margin::Narrow
    }
}

fn majority(prop: u32, opp: u32, tie_break: TieBreakPolicy) -> Side {
    if prop > opp {
        Side::Proposition
    } else if opp > prop {
        Side::Opposition
    } else {
        tie_break.resolve()
    }
}

/// Map each pass's votes to real sides and aggregate.
pub fn tally_votes(
    passes: Vec<(TeamAssignment, Vec<EngagementVote>)>,
    tie_break: TieBreakPolicy,
) -> EngagementVerdict {
    let mut votes = Vec::new();
    let mut pass_winners = Vec::with_capacity(passes.len());

    for (idx, (assignment, pass_votes)) in passes.into_iter().enumerate() {
        let mut pass_prop = 0u32;
        let mut pass_opp = 0u32;
        for vote in pass_votes {
            let side = assignment.side_of(vote.better_team);
            match side {
                Side::Proposition => pass_prop += 1,
                Side::Opposition => pass_opp += 1,
            }
            votes.push(MappedVote {
                pass: idx as u8 + 1,
                assignment,
                side,
                vote,
            });
        }
        pass_winners.push(majority(pass_prop, pass_opp, tie_break));
    }

    let prop_votes = votes.iter().filter(|v| v.side == Side::Proposition).count() as u32;
    let opp_votes = votes.len() as u32 - prop_votes;
    let winner = majority(prop_votes, opp_votes, tie_break);
    let decided_by_policy = prop_votes == opp_votes;
    let margin = classify_vote_margin(prop_votes, opp_votes);
    let mean_confidence = if votes.is_empty() {
        0.0
    } else {
        votes.iter().map(|v| v.vote.confidence).sum::<f64>() / votes.len() as f64
    };
    let pass_agreement = pass_winners.windows(2).all(|w| w[0] == w[1]);

    let summary = summarize(
        prop_votes,
        opp_votes,
        winner,
        decided_by_policy,
        margin,
        mean_confidence,
        &pass_winners,
        pass_agreement,
    );

    EngagementVerdict {
        votes,
        prop_votes,
        opp_votes,
        winner,
        decided_by_policy,
        margin,
        mean_confidence,
        pass_winners,
        pass_agreement,
        summary,
    }
}

#[allow(clippy::too_many_arguments)]
fn summarize(
    prop_votes: u32,
    opp_votes: u32,
    winner: Side,
    decided_by_policy: bool,
    margin: Margin,
    mean_confidence: f64,
    pass_winners: &[Side],
    pass_agreement: bool,
) -> String {
    let total = prop_votes + opp_votes;
    let mut summary = format!(
        "Across {} anonymized judges, {} voted Proposition and {} voted Opposition. ",
        total, prop_votes, opp_votes
    );
    if decided_by_policy {
        summary.push_str(&format!(
            "The vote was tied; {} is awarded by tie-break policy. ",
            winner.label()
        ));
    } else {
        summary.push_str(&format!(
            "{} wins the engagement vote by a {} margin (mean confidence {:.2}). ",
            winner.label(),
            margin,
            mean_confidence
        ));
    }
    if pass_agreement {
        summary.push_str("Both anonymization passes agree.");
    } else {
        let passes = pass_winners
            .iter()
            .enumerate()
            .map(|(i, s)| format!("pass {} favoured {}", i + 1, s.label()))
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!(
            "Warning: the anonymization passes disagree ({}), a sign of position bias.",
            passes
        ));
    }
    summary
}

pub struct EngagementLayer {
    oracle: Arc<dyn ReasoningOracle>,
    invoker: ThrottledInvoker,
    judges: usize,
    temperature: f32,
    tie_break: TieBreakPolicy,
}

impl EngagementLayer {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        invoker: ThrottledInvoker,
        judges: usize,
        temperature: f32,
        tie_break: TieBreakPolicy,
    ) -> Self {
        Self {
            oracle,
            invoker,
            judges: judges.max(1),
            temperature,
            tie_break,
        }
    }

    pub async fn evaluate(&self, transcript: &Transcript) -> AdjudicationResult<EngagementVerdict> {
        let rendered = transcript.render();
        let passes = TeamAssignment::passes();
        info!(
            judges = self.judges,
            passes = passes.len(),
            "Layer 2b: anonymized engagement voting"
        );

        let pass_prompts: Vec<String> = passes
            .iter()
            .map(|assignment| {
                let anonymizer = Anonymizer::new(transcript, *assignment);
                prompts::engagement_vote(
                    &transcript.motion,
                    &anonymizer.apply(transcript.definitions()),
                    &anonymizer.apply(&rendered),
                )
            })
            .collect();

        let oracle = self.oracle.as_ref();
        let calls = pass_prompts.iter().flat_map(|prompt| {
            (0..self.judges).map(move |_| {
                invoke_structured::<EngagementVote>(oracle, prompt.clone(), Some(self.temperature))
            })
        });
        let mut votes = collect_all(LayerKind::Engagement, self.invoker.gather(calls).await)?
            .into_iter();

        let per_pass: Vec<(TeamAssignment, Vec<EngagementVote>)> = passes
            .iter()
            .map(|assignment| (*assignment, votes.by_ref().take(self.judges).collect()))
            .collect();
        let verdict = tally_votes(per_pass, self.tie_break);

        if !verdict.pass_agreement {
            warn!(
                pass_winners = ?verdict.pass_winners,
                "Layer 2b: anonymization passes disagree"
            );
        }
        info!(
            prop_votes = verdict.prop_votes,
            opp_votes = verdict.opp_votes,
            winner = %verdict.winner,
            margin = %verdict.margin,
            "Layer 2b complete"
        );
        Ok(verdict)
    }
}
