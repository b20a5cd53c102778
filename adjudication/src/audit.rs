//! Layer 3: structural audit. A single oracle call that tracks which claims
//! survive; used for corroboration and as the last-resort verdict.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AdjudicationResult;
use crate::oracle::{invoke_structured, Contract, ReasoningOracle};
use crate::prompts;
use crate::throttle::ThrottledInvoker;
use crate::transcript::{Side, Transcript};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditedClaim {
    pub speaker_name: String,
    pub side: Side,
    pub claim: String,
    #[serde(default)]
    pub rebutted_by: Vec<String>,
    /// Whether the strongest rebuttal succeeded; absent when unrebutted.
    #[serde(default)]
    pub rebuttal_successful: Option<bool>,
    pub survives: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArgumentAudit {
    pub claims: Vec<AuditedClaim>,
    pub prop_claims_surviving: u32,
    pub opp_claims_surviving: u32,
    pub structural_winner: Side,
    #[serde(default)]
    pub key_uncontested_claims: Vec<String>,
    #[serde(default)]
    pub key_demolished_claims: Vec<String>,
    pub structural_summary: String,
}

impl ArgumentAudit {
    pub fn surviving(&self, side: Side) -> u32 {
        match side {
            Side::Proposition => self.prop_claims_surviving,
            Side::Opposition => self.opp_claims_surviving,
        }
    }
}

impl Contract for ArgumentAudit {
    const NAME: &'static str = "argument_audit";

    fn validate(&self) -> Result<(), String> {
        if self.structural_summary.trim().is_empty() {
            return Err("structural_summary is empty".into());
        }
        Ok(())
    }
}

pub struct AuditLayer {
    oracle: Arc<dyn ReasoningOracle>,
    invoker: ThrottledInvoker,
    temperature: f32,
}

impl AuditLayer {
    pub fn new(oracle: Arc<dyn ReasoningOracle>, invoker: ThrottledInvoker, temperature: f32) -> Self {
        Self {
            oracle,
            invoker,
            temperature,
        }
    }

    pub async fn evaluate(&self, transcript: &Transcript) -> AdjudicationResult<ArgumentAudit> {
        info!("Layer 3: structural audit");
        let prompt = prompts::audit(transcript, &transcript.render());
        let audit: ArgumentAudit = self
            .invoker
            .run(invoke_structured(
                self.oracle.as_ref(),
                prompt,
                Some(self.temperature),
            ))
            .await?;
        info!(
            prop_surviving = audit.prop_claims_surviving,
            opp_surviving = audit.opp_claims_surviving,
            winner = %audit.structural_winner,
            "Layer 3 complete"
        );
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_parses_with_optional_fields_missing() {
        let audit: ArgumentAudit = serde_json::from_value(serde_json::json!({
            "claims": [{
                "speaker_name": "Ada",
                "side": "proposition",
                "claim": "Costs fall",
                "survives": true
            }],
            "prop_claims_surviving": 4,
            "opp_claims_surviving": 2,
            "structural_winner": "proposition",
            "structural_summary": "Prop set the agenda."
        }))
        .unwrap();
        assert!(audit.validate().is_ok());
        assert_eq!(audit.surviving(Side::Opposition), 2);
        assert!(audit.claims[0].rebutted_by.is_empty());
        assert_eq!(audit.claims[0].rebuttal_successful, None);
    }
}
