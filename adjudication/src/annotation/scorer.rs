//! Mechanical scorer: pure arithmetic over annotated claims and rebuttals.
//!
//! | Component | Points |
//! |-----------|--------|
//! | evidence-backed / principled / assertion claim | 3 / 2 / 1 |
//! | specific claim | +1 |
//! | demolished claim | x0.5 |
//! | final speaker's claim | x0.5 |
//! | demolition rebuttal | +2 |
//! | direct rebuttal with new information | +1.5 |
//! | rebuttal with logic or new information | +0.5 |
//!
//! Same input, same output: no oracle, no clock, no randomness.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::annotation::claims::{Claim, ClaimId, ClaimType, EngagementLevel, Rebuttal, Specificity};
use crate::config::TieBreakPolicy;
use crate::layer::Margin;
use crate::transcript::Side;

pub const EVIDENCE_BACKED_POINTS: f64 = 3.0;
pub const PRINCIPLED_POINTS: f64 = 2.0;
pub const ASSERTION_POINTS: f64 = 1.0;
pub const SPECIFICITY_BONUS: f64 = 1.0;
pub const DEMOLISHED_FACTOR: f64 = 0.5;
pub const FINAL_SPEAKER_FACTOR: f64 = 0.5;
pub const DEMOLITION_CREDIT: f64 = 2.0;
pub const DIRECT_NEW_INFO_CREDIT: f64 = 1.5;
pub const PARTIAL_CREDIT: f64 = 0.5;

pub const LANDSLIDE_RATIO: f64 = 0.4;
pub const CLEAR_RATIO: f64 = 0.2;

/// Base value of a claim before discounts.
pub fn base_points(claim: &Claim) -> f64 {
    let kind = match claim.claim_type {
        ClaimType::EvidenceBacked => EVIDENCE_BACKED_POINTS,
        ClaimType::Principled => PRINCIPLED_POINTS,
        ClaimType::Assertion => ASSERTION_POINTS,
    };
    match claim.specificity {
        Specificity::Specific => kind + SPECIFICITY_BONUS,
        Specificity::Generic => kind,
    }
}

/// Credit a rebuttal earns for its side.
pub fn rebuttal_credit(rebuttal: &Rebuttal) -> f64 {
    if rebuttal.is_demolition() {
        DEMOLITION_CREDIT
    } else if rebuttal.engagement_level == EngagementLevel::Direct
        && rebuttal.provides_new_information
    {
        DIRECT_NEW_INFO_CREDIT
    } else if rebuttal.addresses_specific_logic || rebuttal.provides_new_information {
        PARTIAL_CREDIT
    } else {
        0.0
    }
}

/// Claims hit by at least one demolition, whoever made it.
pub fn demolished_ids(rebuttals: &[Rebuttal]) -> HashSet<ClaimId> {
    rebuttals
        .iter()
        .filter(|r| r.is_demolition())
        .map(|r| r.target.clone())
        .collect()
}

/// Margin from the relative score difference.
pub fn classify_margin(prop: f64, opp: f64) -> Margin {
    let ratio = (prop - opp).abs() / prop.max(opp).max(1.0);
    if ratio >= LANDSLIDE_RATIO {
        Margin::Landslide
    } else if ratio >= CLEAR_RATIO {
        Margin::Clear
    } else {
        Margin::Narrow
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredClaim {
    pub claim: Claim,
    pub demolished: bool,
    pub final_speaker: bool,
    pub score: f64,
}

/// One side's ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideTally {
    pub total_claims: u32,
    pub surviving: u32,
    pub demolished: u32,
    pub surviving_evidence_backed: u32,
    pub final_speaker_claims: u32,
    pub claim_score: f64,
    pub rebuttal_score: f64,
    pub rebuttals_made: u32,
}

impl SideTally {
    pub fn total(&self) -> f64 {
        self.claim_score + self.rebuttal_score
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationVerdict {
    pub claims: Vec<ScoredClaim>,
    pub rebuttals: Vec<Rebuttal>,
    pub final_slot: Option<u8>,
    pub proposition: SideTally,
    pub opposition: SideTally,
    pub winner: Side,
    /// Set when totals and surviving evidence both tied.
    pub decided_by_policy: bool,
    pub margin: Margin,
    pub breakdown: String,
}

impl AnnotationVerdict {
    pub fn prop_score(&self) -> f64 {
        self.proposition.total()
    }

    pub fn opp_score(&self) -> f64 {
        self.opposition.total()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MechanicalScorer {
    tie_break: TieBreakPolicy,
    final_slot: Option<u8>,
}

impl MechanicalScorer {
    pub fn new(tie_break: TieBreakPolicy) -> Self {
        Self {
            tie_break,
            final_slot: None,
        }
    }

    /// Pin the final speaking slot. Without it, the highest slot among the
    /// claims is taken as final.
    pub fn with_final_slot(mut self, slot: Option<u8>) -> Self {
        self.final_slot = slot;
        self
    }

    pub fn score(&self, claims: Vec<Claim>, rebuttals: Vec<Rebuttal>) -> AnnotationVerdict {
        let demolished = demolished_ids(&rebuttals);
        let final_slot = self
            .final_slot
            .or_else(|| claims.iter().map(Claim::slot).max());

        let mut prop = SideTally::default();
        let mut opp = SideTally::default();

        let scored: Vec<ScoredClaim> = claims
            .into_iter()
            .map(|claim| {
                let is_demolished = demolished.contains(&claim.id);
                let is_final = Some(claim.slot()) == final_slot;
                let mut score = base_points(&claim);
                if is_demolished {
                    score *= DEMOLISHED_FACTOR;
                }
                if is_final {
                    score *= FINAL_SPEAKER_FACTOR;
                }

                let tally = match claim.side {
                    Side::Proposition => &mut prop,
                    Side::Opposition => &mut opp,
                };
                tally.total_claims += 1;
                tally.claim_score += score;
                if is_demolished {
                    tally.demolished += 1;
                } else {
                    tally.surviving += 1;
                    if claim.claim_type == ClaimType::EvidenceBacked {
                        tally.surviving_evidence_backed += 1;
                    }
                }
                if is_final {
                    tally.final_speaker_claims += 1;
                }

                ScoredClaim {
                    claim,
                    demolished: is_demolished,
                    final_speaker: is_final,
                    score,
                }
            })
            .collect();

        let owner: HashMap<&ClaimId, Side> =
            scored.iter().map(|s| (&s.claim.id, s.claim.side)).collect();
        for rebuttal in &rebuttals {
            let Some(&target_side) = owner.get(&rebuttal.target) else {
                continue;
            };
            if rebuttal.side == Some(target_side) {
                continue;
            }
            let tally = match target_side.opponent() {
                Side::Proposition => &mut prop,
                Side::Opposition => &mut opp,
            };
            tally.rebuttal_score += rebuttal_credit(rebuttal);
            tally.rebuttals_made += 1;
        }

        let (p, o) = (prop.total(), opp.total());
        let (winner, decided_by_policy) = if p > o {
            (Side::Proposition, false)
        } else if o > p {
            (Side::Opposition, false)
        } else if prop.surviving_evidence_backed > opp.surviving_evidence_backed {
            (Side::Proposition, false)
        } else if opp.surviving_evidence_backed > prop.surviving_evidence_backed {
            (Side::Opposition, false)
        } else {
            (self.tie_break.resolve(), true)
        };
        let margin = classify_margin(p, o);
        let breakdown = breakdown(&prop, &opp, final_slot);

        AnnotationVerdict {
            claims: scored,
            rebuttals,
            final_slot,
            proposition: prop,
            opposition: opp,
            winner,
            decided_by_policy,
            margin,
            breakdown,
        }
    }
}

fn breakdown(prop: &SideTally, opp: &SideTally, final_slot: Option<u8>) -> String {
    let mut lines = vec![
        format!(
            "Claims: Prop {} ({} surviving, {} demolished), Opp {} ({} surviving, {} demolished)",
            prop.total_claims,
            prop.surviving,
            prop.demolished,
            opp.total_claims,
            opp.surviving,
            opp.demolished
        ),
        format!(
            "Claim scores: Prop {:.1}, Opp {:.1}",
            prop.claim_score, opp.claim_score
        ),
        format!(
            "Rebuttal scores: Prop {:.1} ({} rebuttals), Opp {:.1} ({} rebuttals)",
            prop.rebuttal_score, prop.rebuttals_made, opp.rebuttal_score, opp.rebuttals_made
        ),
    ];
    if let Some(slot) = final_slot {
        let discounted = prop.final_speaker_claims + opp.final_speaker_claims;
        if discounted > 0 {
            lines.push(format!(
                "Final speaker (slot {}): {} claims discounted x{}",
                slot, discounted, FINAL_SPEAKER_FACTOR
            ));
        }
    }
    lines.push(format!(
        "TOTAL: Prop {:.1}, Opp {:.1}",
        prop.total(),
        opp.total()
    ));
    lines.join("\n")
}
