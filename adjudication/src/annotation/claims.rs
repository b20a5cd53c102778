//! Claims, rebuttals, and the oracle contracts that produce them.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::oracle::Contract;
use crate::transcript::{Side, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// Named data, studies, cases or institutions.
    EvidenceBacked,
    /// Reasoning or an ethical framework without empirical evidence.
    Principled,
    /// Stated as fact without support.
    Assertion,
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EvidenceBacked => write!(f, "evidence_backed"),
            Self::Principled => write!(f, "principled"),
            Self::Assertion => write!(f, "assertion"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    Specific,
    Generic,
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific => write!(f, "specific"),
            Self::Generic => write!(f, "generic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    Direct,
    Indirect,
    Strawman,
}

impl fmt::Display for EngagementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Indirect => write!(f, "indirect"),
            Self::Strawman => write!(f, "strawman"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RebuttalMethod {
    CounterEvidence,
    LogicalFlaw,
    CounterExample,
    /// Restating the opposing position without engaging the claim.
    Reassertion,
}

impl fmt::Display for RebuttalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CounterEvidence => write!(f, "counter_evidence"),
            Self::LogicalFlaw => write!(f, "logical_flaw"),
            Self::CounterExample => write!(f, "counter_example"),
            Self::Reassertion => write!(f, "reassertion"),
        }
    }
}

// ── Claim ids ───────────────────────────────────────────────────────

/// `{side}_{slot}_{letter}`, e.g. `prop_3_b`.
///
/// The slot is the owner's 1-based speaking position; the letter orders
/// claims within a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClaimId {
    side: Side,
    slot: u8,
    letter: String,
}

impl ClaimId {
    /// Build the id for the `ordinal`-th (0-based) claim in a slot:
    /// a..z, then aa, ab, ...
    pub fn new(side: Side, slot: u8, ordinal: usize) -> Self {
        Self {
            side,
            slot,
            letter: ordinal_letters(ordinal),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn letter(&self) -> &str {
        &self.letter
    }
}

fn ordinal_letters(mut ordinal: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'a' + (ordinal % 26) as u8);
        if ordinal < 26 {
            break;
        }
        ordinal = ordinal / 26 - 1;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.side.short_label(), self.slot, self.letter)
    }
}

impl FromStr for ClaimId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_matches(|c| c == '[' || c == ']');
        let mut parts = trimmed.splitn(3, '_');
        let (side, slot, letter) = match (parts.next(), parts.next(), parts.next()) {
            (Some(side), Some(slot), Some(letter)) => (side, slot, letter),
            _ => return Err(format!("claim id '{}' is not side_slot_letter", s)),
        };
        let side = Side::from_prefix(side).ok_or_else(|| format!("unknown side in '{}'", s))?;
        let slot: u8 = slot
            .parse()
            .map_err(|_| format!("slot in '{}' is not a number", s))?;
        if slot == 0 {
            return Err(format!("slot in '{}' must be at least 1", s));
        }
        let letter = letter.to_ascii_lowercase();
        if letter.is_empty() || !letter.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(format!("letter in '{}' must be a-z", s));
        }
        Ok(Self { side, slot, letter })
    }
}

impl TryFrom<String> for ClaimId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClaimId> for String {
    fn from(id: ClaimId) -> Self {
        id.to_string()
    }
}

// ── Claims and rebuttals ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub speaker: String,
    pub side: Side,
    pub summary: String,
    pub claim_type: ClaimType,
    pub specificity: Specificity,
}

impl Claim {
    pub fn slot(&self) -> u8 {
        self.id.slot()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rebuttal {
    pub target: ClaimId,
    pub speaker: String,
    /// Rebutting speaker's side, when the speaker is in the transcript.
    pub side: Option<Side>,
    pub summary: String,
    pub engagement_level: EngagementLevel,
    pub method: RebuttalMethod,
    pub addresses_specific_logic: bool,
    pub provides_new_information: bool,
    pub undermines_original: bool,
}

impl Rebuttal {
    /// A demolition both engages the claim's logic and undermines it.
    pub fn is_demolition(&self) -> bool {
        self.addresses_specific_logic && self.undermines_original
    }
}

// ── Oracle contracts ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedClaim {
    pub claim_id: String,
    pub speaker_name: String,
    pub side: Side,
    pub claim_text: String,
    pub claim_type: ClaimType,
    pub specificity: Specificity,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClaimExtraction {
    pub claims: Vec<ExtractedClaim>,
}

impl Contract for ClaimExtraction {
    const NAME: &'static str = "claim_extraction";
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MappedRebuttal {
    pub target_claim_id: String,
    pub rebutting_speaker: String,
    pub rebuttal_summary: String,
    pub engagement_level: EngagementLevel,
    pub method: RebuttalMethod,
    pub addresses_specific_logic: bool,
    pub provides_new_information: bool,
    pub undermines_original: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RebuttalMapping {
    pub rebuttals: Vec<MappedRebuttal>,
}

impl Contract for RebuttalMapping {
    const NAME: &'static str = "rebuttal_mapping";
}

/// Rebuild claim ids from the transcript.
///
/// The owner is found by speaker name, falling back to the slot in the
/// oracle's id. The slot becomes the owner's real position, the side comes
/// from the transcript, and letters are reassigned per slot in extraction
/// order. Claims that cannot be tied to a speech are dropped.
pub fn canonicalize_claims(extracted: Vec<ExtractedClaim>, transcript: &Transcript) -> Vec<Claim> {
    let mut per_slot: BTreeMap<u8, usize> = BTreeMap::new();
    let mut claims = Vec::with_capacity(extracted.len());

    for raw in extracted {
        let owner = transcript.speech_by_speaker(&raw.speaker_name).or_else(|| {
            raw.claim_id
                .parse::<ClaimId>()
                .ok()
                .and_then(|id| transcript.speech_at(id.slot()))
        });
        let Some(speech) = owner else {
            warn!(
                claim_id = %raw.claim_id,
                speaker = %raw.speaker_name,
                "Dropping claim from unknown speaker"
            );
            continue;
        };

        let ordinal = per_slot.entry(speech.position).or_insert(0);
        let id = ClaimId::new(speech.side, speech.position, *ordinal);
        *ordinal += 1;

        claims.push(Claim {
            id,
            speaker: speech.speaker.clone(),
            side: speech.side,
            summary: raw.claim_text,
            claim_type: raw.claim_type,
            specificity: raw.specificity,
        });
    }
    claims
}

/// Parse rebuttal targets and resolve each rebutter's side.
///
/// Rebuttals whose target is not a well-formed claim id are dropped.
pub fn resolve_rebuttals(mapped: Vec<MappedRebuttal>, transcript: &Transcript) -> Vec<Rebuttal> {
    mapped
        .into_iter()
        .filter_map(|m| {
            let target = match m.target_claim_id.parse::<ClaimId>() {
                Ok(id) => id,
                Err(e) => {
                    warn!(error = %e, "Dropping rebuttal with malformed target");
                    return None;
                }
            };
            let side = transcript
                .speech_by_speaker(&m.rebutting_speaker)
                .map(|s| s.side);
            Some(Rebuttal {
                target,
                speaker: m.rebutting_speaker,
                side,
                summary: m.rebuttal_summary,
                engagement_level: m.engagement_level,
                method: m.method,
                addresses_specific_logic: m.addresses_specific_logic,
                provides_new_information: m.provides_new_information,
                undermines_original: m.undermines_original,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Speech;

    fn transcript() -> Transcript {
        Transcript::new(
            "motion",
            vec![
                Speech::new("Ada", Side::Proposition, 1, "a"),
                Speech::new("Ben", Side::Opposition, 2, "b"),
                Speech::new("Cy", Side::Proposition, 3, "c"),
                Speech::new("Di", Side::Opposition, 4, "d"),
            ],
        )
    }

    fn extracted(id: &str, speaker: &str, side: Side) -> ExtractedClaim {
        ExtractedClaim {
            claim_id: id.into(),
            speaker_name: speaker.into(),
            side,
            claim_text: "x".into(),
            claim_type: ClaimType::Principled,
            specificity: Specificity::Generic,
        }
    }

    #[test]
    fn test_claim_id_parse_and_display() {
        let id: ClaimId = "prop_3_b".parse().unwrap();
        assert_eq!(id.side(), Side::Proposition);
        assert_eq!(id.slot(), 3);
        assert_eq!(id.letter(), "b");
        assert_eq!(id.to_string(), "prop_3_b");
        assert!("prop_0_a".parse::<ClaimId>().is_err());
        assert!("gov_1_a".parse::<ClaimId>().is_err());
        assert!("prop_1".parse::<ClaimId>().is_err());
        assert!("opp_2_7".parse::<ClaimId>().is_err());
    }

    #[test]
    fn test_ordinal_letters_roll_over() {
        assert_eq!(ClaimId::new(Side::Opposition, 2, 0).to_string(), "opp_2_a");
        assert_eq!(ClaimId::new(Side::Opposition, 2, 25).letter(), "z");
        assert_eq!(ClaimId::new(Side::Opposition, 2, 26).letter(), "aa");
        assert_eq!(ClaimId::new(Side::Opposition, 2, 27).letter(), "ab");
    }

    #[test]
    fn test_claim_id_serde_as_string() {
        let id = ClaimId::new(Side::Proposition, 1, 0);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"prop_1_a\"");
        let back: ClaimId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_canonical_slot_is_speaking_position() {
        // The oracle numbered Cy as the second prop speaker; Cy actually spoke third.
        let claims = canonicalize_claims(
            vec![
                extracted("prop_2_a", "Cy", Side::Proposition),
                extracted("prop_2_b", "Cy", Side::Proposition),
                extracted("opp_1_a", "Ben", Side::Opposition),
            ],
            &transcript(),
        );
        assert_eq!(claims[0].id.to_string(), "prop_3_a");
        assert_eq!(claims[1].id.to_string(), "prop_3_b");
        assert_eq!(claims[2].id.to_string(), "opp_2_a");
        for c in &claims {
            let speech = transcript().speech_by_speaker(&c.speaker).cloned().unwrap();
            assert_eq!(c.slot(), speech.position);
        }
    }

    #[test]
    fn test_unknown_speaker_falls_back_to_slot_or_is_dropped() {
        let claims = canonicalize_claims(
            vec![
                extracted("opp_4_a", "Dee", Side::Opposition),
                extracted("opp_9_a", "Nobody", Side::Opposition),
            ],
            &transcript(),
        );
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].speaker, "Di");
    }

    #[test]
    fn test_side_comes_from_transcript() {
        let claims = canonicalize_claims(
            vec![extracted("opp_1_a", "Ada", Side::Opposition)],
            &transcript(),
        );
        assert_eq!(claims[0].side, Side::Proposition);
        assert_eq!(claims[0].id.to_string(), "prop_1_a");
    }

    #[test]
    fn test_resolve_rebuttals_drops_malformed_targets() {
        let mapped = vec![
            MappedRebuttal {
                target_claim_id: "prop_1_a".into(),
                rebutting_speaker: "Ben".into(),
                rebuttal_summary: "no".into(),
                engagement_level: EngagementLevel::Direct,
                method: RebuttalMethod::LogicalFlaw,
                addresses_specific_logic: true,
                provides_new_information: false,
                undermines_original: true,
            },
            MappedRebuttal {
                target_claim_id: "the first claim".into(),
                rebutting_speaker: "Ben".into(),
                rebuttal_summary: "no".into(),
                engagement_level: EngagementLevel::Indirect,
                method: RebuttalMethod::Reassertion,
                addresses_specific_logic: false,
                provides_new_information: false,
                undermines_original: false,
            },
        ];
        let rebuttals = resolve_rebuttals(mapped, &transcript());
        assert_eq!(rebuttals.len(), 1);
        assert_eq!(rebuttals[0].side, Some(Side::Opposition));
        assert!(rebuttals[0].is_demolition());
    }
}
