//! Definitional framework for a debate.
//!
//! The first Proposition speaker sets the terms, the first Opposition speaker
//! accepts or contests them. The engine only consumes the rendered block.

use serde::{Deserialize, Serialize};

/// A key term and how it was defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermDefinition {
    pub term: String,
    pub definition: String,
}

/// The Proposition's definitional framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionsFrame {
    pub key_terms: Vec<TermDefinition>,
    /// What is in scope.
    pub scope: String,
    /// What is explicitly out of scope.
    #[serde(default)]
    pub exclusions: String,
    /// How the Proposition frames the central question.
    pub proposition_framing: String,
}

/// The Opposition's response to the framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionsContestation {
    pub accepts_definitions: bool,
    #[serde(default)]
    pub contested_terms: Vec<TermDefinition>,
    #[serde(default)]
    pub counter_framing: String,
    #[serde(default)]
    pub agreed_ground: String,
}

/// Render the framing block injected into every judging prompt.
pub fn definitions_context(
    frame: &DefinitionsFrame,
    contestation: Option<&DefinitionsContestation>,
) -> String {
    let mut parts = vec![
        "DEFINITIONAL FRAMEWORK FOR THIS DEBATE".to_string(),
        "=".repeat(45),
        String::new(),
        "The Proposition has defined the key terms as follows:".to_string(),
    ];
    for t in &frame.key_terms {
        parts.push(format!("  * {}: {}", t.term, t.definition));
    }
    parts.push(format!("\nScope: {}", frame.scope));
    if !frame.exclusions.is_empty() {
        parts.push(format!("Exclusions: {}", frame.exclusions));
    }
    parts.push(format!("Proposition's framing: {}", frame.proposition_framing));

    if let Some(c) = contestation {
        parts.push(String::new());
        if c.accepts_definitions {
            parts.push("The Opposition ACCEPTS these definitions.".to_string());
        } else {
            parts.push("The Opposition CONTESTS some definitions:".to_string());
            for t in &c.contested_terms {
                parts.push(format!("  * {}: {}", t.term, t.definition));
            }
        }
        if !c.counter_framing.is_empty() {
            parts.push(format!("Opposition's counter-framing: {}", c.counter_framing));
        }
        if !c.agreed_ground.is_empty() {
            parts.push(format!("Agreed ground: {}", c.agreed_ground));
        }
    }

    parts.push(String::new());
    parts.push(
        "Speakers are expected to argue within this framework or contest it \
         explicitly; silently operating under different definitions is a weakness."
            .to_string(),
    );
    parts.join("\n")
}
