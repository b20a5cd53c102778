//! Speaker and side anonymization for the engagement passes.

use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

use crate::transcript::{Side, Transcript};

/// Serialized as `"Team A"` / `"Team B"`. Parsing ignores case and extra
/// whitespace and accepts a bare letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub enum Team {
    #[serde(rename = "Team A")]
    A,
    #[serde(rename = "Team B")]
    B,
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        match normalized.as_str() {
            "team a" | "a" => Ok(Self::A),
            "team b" | "b" => Ok(Self::B),
            _ => Err(format!("unknown team '{}'", s)),
        }
    }
}

impl<'de> Deserialize<'de> for Team {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Team {
    pub fn letter(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Team {}", self.letter())
    }
}

/// Which team label the Proposition wears in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub proposition_team: Team,
}

impl TeamAssignment {
    /// Pass 1: Proposition is Team A.
    pub const PROPOSITION_AS_A: Self = Self {
        proposition_team: Team::A,
    };
    /// Pass 2: Proposition is Team B.
    pub const PROPOSITION_AS_B: Self = Self {
        proposition_team: Team::B,
    };

    /// The two passes, in order.
    pub fn passes() -> [Self; 2] {
        [Self::PROPOSITION_AS_A, Self::PROPOSITION_AS_B]
    }

    pub fn mirrored(self) -> Self {
        Self {
            proposition_team: self.proposition_team.other(),
        }
    }

    pub fn team_of(self, side: Side) -> Team {
        match side {
            Side::Proposition => self.proposition_team,
            Side::Opposition => self.proposition_team.other(),
        }
    }

    pub fn side_of(self, team: Team) -> Side {
        if team == self.proposition_team {
            Side::Proposition
        } else {
            Side::Opposition
        }
    }
}

/// Ordered text substitutions hiding who is who.
#[derive(Debug, Clone)]
pub struct Anonymizer {
    replacements: Vec<(String, String)>,
}

impl Anonymizer {
    /// Speaker names become `Team X Speaker n` (n counts within the side in
    /// speaking order). Longer names are replaced first so a name that
    /// contains another is never half-substituted. Side labels follow in
    /// upper, title and lower case.
    pub fn new(transcript: &Transcript, assignment: TeamAssignment) -> Self {
        let mut names: Vec<(String, String)> = Vec::new();
        for side in Side::BOTH {
            let team = assignment.team_of(side);
            for (i, speech) in transcript.side_speeches(side).iter().enumerate() {
                names.push((speech.speaker.clone(), format!("{} Speaker {}", team, i + 1)));
            }
        }
        names.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let mut replacements = names;
        for side in Side::BOTH {
            let team = assignment.team_of(side);
            let upper = side.label();
            let title = title_case(upper);
            let team_label = team.to_string();
            replacements.push((upper.to_string(), team_label.to_uppercase()));
            replacements.push((title, team_label.clone()));
            replacements.push((upper.to_lowercase(), team_label.to_lowercase()));
        }

        Self { replacements }
    }

    pub fn apply(&self, text: &str) -> String {
        self.replacements
            .iter()
            .filter(|(from, _)| !from.is_empty())
            .fold(text.to_string(), |acc, (from, to)| acc.replace(from.as_str(), to))
    }
}

fn title_case(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
