//! Human-readable report of every layer's findings.
//!
//! Pure rendering of a [`DivisionResult`]: nothing here affects the verdict.

use crate::layer::{LayerKind, LayerStatus};
use crate::synthesis::DivisionResult;
use crate::transcript::Side;

fn side_tag(side: Side) -> &'static str {
    match side {
        Side::Proposition => "PROP",
        Side::Opposition => "OPP",
    }
}

fn tick(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn tie_break(decided_by_policy: bool) -> &'static str {
    if decided_by_policy {
        " (awarded by tie-break policy)"
    } else {
        ""
    }
}

fn section(lines: &mut Vec<String>, kind: LayerKind) {
    lines.push(format!(
        "LAYER {}: {}",
        kind.number(),
        kind.title().to_uppercase()
    ));
    lines.push("-".repeat(40));
}

fn failed_line(lines: &mut Vec<String>, kind: LayerKind, statuses: &[LayerStatus]) {
    let reason = statuses
        .iter()
        .find(|s| s.layer == kind)
        .and_then(|s| s.failure_reason.as_deref())
        .unwrap_or("no result");
    lines.push(format!("  (Layer {} failed: {})", kind.number(), reason));
}

/// Render the full multi-layer report.
pub fn render_report(result: &DivisionResult) -> String {
    let mut lines = vec![
        "=".repeat(60),
        "MULTI-LAYER VERDICT ANALYSIS".to_string(),
        "=".repeat(60),
        format!("Motion: {}", result.motion),
        format!("Adjudication: {}", result.adjudication_id),
        String::new(),
    ];

    // ── Layer 1 ─────────────────────────────────────────────────────
    section(&mut lines, LayerKind::Rubric);
    match &result.rubric {
        Some(card) => {
            if card.recalibrated {
                lines.push(format!(
                    "  Initial scores clustered (spread {:.1}, {} distinct values); recalibrated.",
                    card.initial_stats.spread, card.initial_stats.unique_ints
                ));
                lines.push(String::new());
            }
            for s in &card.scores {
                let rank = s.rank.map(|r| format!("  [rank {}]", r)).unwrap_or_default();
                lines.push(format!("  {} ({}){}", s.speaker, side_tag(s.side), rank));
                lines.push(format!("    Argument Strength:     {:.1}/10", s.argument_strength));
                lines.push(format!("    Rebuttal Quality:      {:.1}/10", s.rebuttal_quality));
                lines.push(format!("    Evidence Grounding:    {:.1}/10", s.evidence_grounding));
                lines.push(format!(
                    "    Rhetorical Effect.:    {:.1}/10",
                    s.rhetorical_effectiveness
                ));
                lines.push(format!("    Persona Fidelity:      {:.1}/10", s.persona_fidelity));
                lines.push(format!("    OVERALL:               {:.1}/10", s.overall));
                lines.push(format!("    Rationale: {}", s.rationale));
                lines.push(String::new());
            }
            if let (Some(best), Some(weakest)) = (card.best_speaker(), card.weakest_speaker()) {
                lines.push(format!(
                    "  Most effective: {} ({:.1}/10)  |  Least effective: {} ({:.1}/10)",
                    best.speaker, best.overall, weakest.speaker, weakest.overall
                ));
            }
            lines.push(format!(
                "  Prop Total: {:.1}  |  Opp Total: {:.1}  ->  {}{}",
                card.prop_total,
                card.opp_total,
                card.winner.label(),
                tie_break(card.decided_by_policy)
            ));
        }
        None => failed_line(&mut lines, LayerKind::Rubric, &result.layers),
    }
    lines.push(String::new());

    // ── Layer 2a ────────────────────────────────────────────────────
    section(&mut lines, LayerKind::Annotation);
    match &result.annotation {
        Some(a) => {
            lines.push(format!(
                "  Claims extracted: {} Prop, {} Opp",
                a.proposition.total_claims, a.opposition.total_claims
            ));
            lines.push(format!("  Rebuttals mapped: {}", a.rebuttals.len()));
            lines.push(String::new());
            lines.push("  CLAIMS:".to_string());
            for sc in &a.claims {
                let c = &sc.claim;
                let status = if sc.demolished { "DEMOLISHED" } else { "SURVIVES" };
                let final_note = if sc.final_speaker { " (final speaker)" } else { "" };
                lines.push(format!(
                    "    [{}] {} ({}) [{}, {}] {}{}  = {:.1}",
                    c.id,
                    c.speaker,
                    side_tag(c.side),
                    c.claim_type,
                    c.specificity,
                    status,
                    final_note,
                    sc.score
                ));
                lines.push(format!("      {}", c.summary));
            }
            lines.push(String::new());
            if !a.rebuttals.is_empty() {
                lines.push("  REBUTTALS:".to_string());
                for r in &a.rebuttals {
                    lines.push(format!(
                        "    {} -> [{}] ({}, {})",
                        r.speaker, r.target, r.engagement_level, r.method
                    ));
                    lines.push(format!(
                        "      Addresses logic: {}  New info: {}  Undermines: {}",
                        tick(r.addresses_specific_logic),
                        tick(r.provides_new_information),
                        tick(r.undermines_original)
                    ));
                    lines.push(format!("      {}", r.summary));
                }
                lines.push(String::new());
            }
            lines.push("  SCORE BREAKDOWN:".to_string());
            lines.extend(a.breakdown.lines().map(|l| format!("    {}", l)));
            lines.push(String::new());
            lines.push(format!(
                "  -> {} ({}){}",
                a.winner.label(),
                a.margin,
                tie_break(a.decided_by_policy)
            ));
        }
        None => failed_line(&mut lines, LayerKind::Annotation, &result.layers),
    }
    lines.push(String::new());

    // ── Layer 2b ────────────────────────────────────────────────────
    section(&mut lines, LayerKind::Engagement);
    match &result.engagement {
        Some(e) => {
            lines.push(format!("  Votes: Prop {} - Opp {}", e.prop_votes, e.opp_votes));
            lines.push(format!(
                "  Passes agree: {}",
                if e.pass_agreement { "YES" } else { "NO" }
            ));
            lines.push(format!("  Mean confidence: {:.2}", e.mean_confidence));
            lines.push(format!(
                "  -> {} ({}){}",
                e.winner.label(),
                e.margin,
                tie_break(e.decided_by_policy)
            ));
            lines.push(String::new());
            for (i, mv) in e.votes.iter().enumerate() {
                let v = &mv.vote;
                lines.push(format!(
                    "  Judge {} (Pass {}): {} = {} (conf: {:.2})",
                    i + 1,
                    mv.pass,
                    v.better_team,
                    mv.side.label(),
                    v.confidence
                ));
                lines.push(format!(
                    "    Engagement: A={:.0}/10, B={:.0}/10",
                    v.engagement_quality_a, v.engagement_quality_b
                ));
                lines.push(format!("    Strongest A: {}", v.strongest_argument_a));
                lines.push(format!("    Strongest B: {}", v.strongest_argument_b));
                lines.push(format!("    Best rebuttal: {}", v.best_rebuttal));
                lines.push(format!("    Decisive moment: {}", v.decisive_moment));
                lines.push(format!("    Key reason: {}", v.key_reason));
                lines.push(String::new());
            }
        }
        None => failed_line(&mut lines, LayerKind::Engagement, &result.layers),
    }
    lines.push(String::new());

    // ── Layer 3 ─────────────────────────────────────────────────────
    section(&mut lines, LayerKind::Audit);
    match &result.audit {
        Some(a) => {
            lines.push(format!("  Prop claims surviving: {}", a.prop_claims_surviving));
            lines.push(format!("  Opp claims surviving:  {}", a.opp_claims_surviving));
            lines.push(format!(
                "  Structural winner:     {}",
                a.structural_winner.label()
            ));
            if !a.key_uncontested_claims.is_empty() {
                lines.push("  Uncontested claims:".to_string());
                lines.extend(a.key_uncontested_claims.iter().map(|c| format!("    * {}", c)));
            }
            if !a.key_demolished_claims.is_empty() {
                lines.push("  Demolished claims:".to_string());
                lines.extend(a.key_demolished_claims.iter().map(|c| format!("    * {}", c)));
            }
            lines.push(format!("  Summary: {}", a.structural_summary));
        }
        None => failed_line(&mut lines, LayerKind::Audit, &result.layers),
    }
    lines.push(String::new());

    // ── Overall ─────────────────────────────────────────────────────
    lines.push("OVERALL VERDICT".to_string());
    lines.push("-".repeat(40));
    let governing = match result.governing_layer {
        Some(layer) => format!("{} layer", layer),
        None => "default-winner policy".to_string(),
    };
    lines.push(format!(
        "  {} ({} - {}, {} margin, confidence {:.2}; governed by {})",
        result.winner.label(),
        result.ayes,
        result.noes,
        result.margin,
        result.confidence,
        governing
    ));
    let layer_line = result
        .layers
        .iter()
        .map(|s| {
            format!(
                "{} {}",
                s.layer,
                if s.succeeded { "ok" } else { "FAILED" }
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    lines.push(format!("  Layers: {}", layer_line));
    lines.push(format!("  {}", result.summary));

    lines.join("\n")
}
