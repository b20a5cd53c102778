//! Debate transcript model: speeches, points of information, motion.
//!
//! The transcript is produced upstream and is read-only to the engine. Every
//! layer renders it through [`Transcript::render`] so all oracle prompts see
//! the same text.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{AdjudicationError, AdjudicationResult};

/// Side of the house.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Proposition,
    Opposition,
}

impl Side {
    /// Both sides, Proposition first.
    pub const BOTH: [Side; 2] = [Side::Proposition, Side::Opposition];

    pub fn opponent(self) -> Self {
        match self {
            Self::Proposition => Self::Opposition,
            Self::Opposition => Self::Proposition,
        }
    }

    /// Prefix used in claim ids (`prop` / `opp`).
    pub fn short_label(self) -> &'static str {
        match self {
            Self::Proposition => "prop",
            Self::Opposition => "opp",
        }
    }

    /// Upper-case label used in transcripts and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Proposition => "PROPOSITION",
            Self::Opposition => "OPPOSITION",
        }
    }

    /// Parse a claim-id prefix or a full side name.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.trim().to_ascii_lowercase().as_str() {
            "prop" | "proposition" => Some(Self::Proposition),
            "opp" | "opposition" => Some(Self::Opposition),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Proposition => write!(f, "proposition"),
            Self::Opposition => write!(f, "opposition"),
        }
    }
}

/// A single delivered speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speech {
    /// Speaker's display name.
    pub speaker: String,
    pub side: Side,
    /// 1-based position in the overall speaking order.
    pub position: u8,
    /// The speech as delivered.
    pub text: String,
}

impl Speech {
    pub fn new(speaker: impl Into<String>, side: Side, position: u8, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            side,
            position,
            text: text.into(),
        }
    }
}

/// A Point of Information offered during a speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interjection {
    pub from_speaker: String,
    pub to_speaker: String,
    pub text: String,
    pub accepted: bool,
    /// The speaker's answer, if the POI was accepted.
    #[serde(default)]
    pub response: Option<String>,
    /// Index of the argument point this POI follows.
    #[serde(default)]
    pub after_argument: usize,
}

/// A finished debate, ready for adjudication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub motion: String,
    pub speeches: Vec<Speech>,
    #[serde(default)]
    pub interjections: Vec<Interjection>,
    /// Framing block injected verbatim into every oracle prompt.
    #[serde(default)]
    pub definitions_context: Option<String>,
}

impl Transcript {
    pub fn new(motion: impl Into<String>, speeches: Vec<Speech>) -> Self {
        Self {
            motion: motion.into(),
            speeches,
            interjections: Vec::new(),
            definitions_context: None,
        }
    }

    pub fn with_interjections(mut self, interjections: Vec<Interjection>) -> Self {
        self.interjections = interjections;
        self
    }

    pub fn with_definitions_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.definitions_context = if context.trim().is_empty() {
            None
        } else {
            Some(context)
        };
        self
    }

    /// Check the structural requirements the layers rely on.
    pub fn validate(&self) -> AdjudicationResult<()> {
        if self.motion.trim().is_empty() {
            return Err(AdjudicationError::InvalidTranscript(
                "motion is empty".to_string(),
            ));
        }
        if self.speeches.len() < 2 {
            return Err(AdjudicationError::InvalidTranscript(format!(
                "need at least 2 speeches, got {}",
                self.speeches.len()
            )));
        }
        for side in Side::BOTH {
            if !self.speeches.iter().any(|s| s.side == side) {
                return Err(AdjudicationError::InvalidTranscript(format!(
                    "no {} speeches",
                    side
                )));
            }
        }

        let mut positions = HashSet::new();
        let mut speakers = HashSet::new();
        for speech in &self.speeches {
            if speech.position == 0 {
                return Err(AdjudicationError::InvalidTranscript(format!(
                    "speaker '{}' has position 0 (positions are 1-based)",
                    speech.speaker
                )));
            }
            if !positions.insert(speech.position) {
                return Err(AdjudicationError::InvalidTranscript(format!(
                    "duplicate speaking position {}",
                    speech.position
                )));
            }
            let name = speech.speaker.trim();
            if name.is_empty() {
                return Err(AdjudicationError::InvalidTranscript(format!(
                    "speech at position {} has no speaker",
                    speech.position
                )));
            }
            if !speakers.insert(name.to_lowercase()) {
                return Err(AdjudicationError::InvalidTranscript(format!(
                    "duplicate speaker '{}'",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Speeches in overall speaking order.
    pub fn ordered_speeches(&self) -> Vec<&Speech> {
        let mut ordered: Vec<&Speech> = self.speeches.iter().collect();
        ordered.sort_by_key(|s| s.position);
        ordered
    }

    /// One side's speeches in speaking order.
    pub fn side_speeches(&self, side: Side) -> Vec<&Speech> {
        self.ordered_speeches()
            .into_iter()
            .filter(|s| s.side == side)
            .collect()
    }

    /// Look up a speech by speaker name (exact first, then case-insensitive).
    pub fn speech_by_speaker(&self, name: &str) -> Option<&Speech> {
        let name = name.trim();
        self.speeches
            .iter()
            .find(|s| s.speaker == name)
            .or_else(|| {
                self.speeches
                    .iter()
                    .find(|s| s.speaker.trim().eq_ignore_ascii_case(name))
            })
    }

    pub fn speech_at(&self, position: u8) -> Option<&Speech> {
        self.speeches.iter().find(|s| s.position == position)
    }

    /// Position of the last speaker, who cannot be rebutted.
    pub fn final_position(&self) -> Option<u8> {
        self.speeches.iter().map(|s| s.position).max()
    }

    /// Definitions context, or an empty string.
    pub fn definitions(&self) -> &str {
        self.definitions_context.as_deref().unwrap_or("")
    }

    /// Render the transcript as prompt text, POIs inline under the speech
    /// they interrupted.
    pub fn render(&self) -> String {
        let ordered = self.ordered_speeches();
        if ordered.is_empty() {
            return "(No speeches.)".to_string();
        }

        let mut parts: Vec<String> = Vec::new();
        for speech in ordered {
            parts.push(format!("--- {} ({}) ---", speech.speaker, speech.side.label()));
            parts.push(speech.text.clone());

            for poi in self
                .interjections
                .iter()
                .filter(|p| p.to_speaker == speech.speaker)
            {
                let status = if poi.accepted { "ACCEPTED" } else { "DECLINED" };
                parts.push(format!("\n  [POI from {} - {}]", poi.from_speaker, status));
                parts.push(format!("  \"{}\"", poi.text));
                if poi.accepted {
                    if let Some(response) = &poi.response {
                        parts.push(format!("  Response: {}", response));
                    }
                }
            }
            parts.push(String::new());
        }
        parts.join("\n")
    }
}
