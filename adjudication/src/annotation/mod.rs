//! Layer 2a: argument annotation.
//!
//! The oracle only annotates: it extracts claims, then maps rebuttals onto
//! them. All scoring is done by [`scorer::MechanicalScorer`].

pub mod claims;
pub mod scorer;

use std::sync::Arc;

use tracing::info;

use crate::config::TieBreakPolicy;
use crate::error::AdjudicationResult;
use crate::oracle::{invoke_structured, ReasoningOracle};
use crate::prompts;
use crate::throttle::ThrottledInvoker;
use crate::transcript::Transcript;

use claims::{canonicalize_claims, resolve_rebuttals, ClaimExtraction, RebuttalMapping};
use scorer::{AnnotationVerdict, MechanicalScorer};

pub struct AnnotationLayer {
    oracle: Arc<dyn ReasoningOracle>,
    invoker: ThrottledInvoker,
    temperature: f32,
    tie_break: TieBreakPolicy,
}

impl AnnotationLayer {
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

    pub async fn evaluate(&self, transcript: &Transcript) -> AdjudicationResult<AnnotationVerdict> {
        let rendered = transcript.render();

        info!("Layer 2a: extracting claims");
        let extraction: ClaimExtraction = self
            .invoker
            .run(invoke_structured(
                self.oracle.as_ref(),
                prompts::claim_extraction(transcript, &rendered),
                Some(self.temperature),
            ))
            .await?;
        let claims = canonicalize_claims(extraction.claims, transcript);

        info!(claims = claims.len(), "Layer 2a: mapping rebuttals");
        let mapping: RebuttalMapping = self
            .invoker
            .run(invoke_structured(
                self.oracle.as_ref(),
                prompts::rebuttal_mapping(transcript, &rendered, &claims),
                Some(self.temperature),
            ))
            .await?;
        let rebuttals = resolve_rebuttals(mapping.rebuttals, transcript);

        let verdict = MechanicalScorer::new(self.tie_break)
            .with_final_slot(transcript.final_position())
            .score(claims, rebuttals);
        info!(
            prop_score = verdict.prop_score(),
            opp_score = verdict.opp_score(),
            winner = %verdict.winner,
            margin = %verdict.margin,
            "Layer 2a complete"
        );
        Ok(verdict)
    }
}
