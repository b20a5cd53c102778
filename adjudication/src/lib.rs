//! Multi-layer debate adjudication.
//!
//! Given a debate transcript, four independent evaluation layers interrogate
//! it through a reasoning oracle, and their findings are combined into one
//! explainable division:
//!
//! - Layer 1 `rubric`: per-speech scores on five dimensions, with a
//!   recalibration pass when the scores cluster
//! - Layer 2a `annotation`: claim and rebuttal annotation, scored by pure
//!   arithmetic in [`MechanicalScorer`]
//! - Layer 2b `engagement`: anonymized comparative judging in two passes with
//!   the team labels swapped (the primary signal)
//! - Layer 3 `audit`: structural claim-survival audit
//!
//! # Flow
//!
//! ```text
//! Transcript ──► Rubric ──► Annotation ──► Engagement ──► Audit
//!                   │            │              │           │
//!                   └────────────┴──── LayerOutcome ────────┘
//!                                          │
//!                                  VerdictSynthesizer ──► DivisionResult + report
//! ```
//!
//! Layers run one after another. Inside a layer, oracle calls fan out through
//! a [`ThrottledInvoker`] (2 concurrent calls, 1 s cooldown by default). A
//! layer that fails is recorded as failed and the remaining layers still run.
//!
//! # Usage
//!
//! ```ignore
//! let adjudicator = Adjudicator::new(oracle, &AdjudicationConfig::default())?;
//! let Adjudication { division, report } = adjudicator.adjudicate(&transcript).await?;
//! println!("{} wins ({})", division.winner, division.margin);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod annotation;
pub mod audit;
pub mod config;
pub mod definitions;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod layer;
pub mod oracle;
pub mod prompts;
pub mod report;
pub mod rubric;
pub mod synthesis;
pub mod throttle;
pub mod transcript;

pub use annotation::claims::{
    Claim, ClaimId, ClaimType, EngagementLevel, Rebuttal, RebuttalMethod, Specificity,
};
pub use annotation::scorer::{AnnotationVerdict, MechanicalScorer, ScoredClaim, SideTally};
pub use annotation::AnnotationLayer;
pub use audit::{ArgumentAudit, AuditLayer, AuditedClaim};
pub use config::{AdjudicationConfig, NoVerdictPolicy, TieBreakPolicy};
pub use definitions::{definitions_context, DefinitionsContestation, DefinitionsFrame, TermDefinition};
pub use engagement::anonymize::{Anonymizer, Team, TeamAssignment};
pub use engagement::{EngagementLayer, EngagementVerdict, EngagementVote, MappedVote};
pub use engine::{Adjudication, Adjudicator};
pub use error::{AdjudicationError, AdjudicationResult};
pub use layer::{LayerFailure, LayerKind, LayerOutcome, LayerStatus, Margin};
pub use oracle::{
    invoke_structured, Contract, OracleError, OracleErrorKind, OracleRequest, ReasoningOracle,
};
pub use report::render_report;
pub use rubric::{ClusterStats, RubricLayer, RubricScorecard, SpeechScore};
pub use synthesis::{AgreementReport, DivisionResult, LayerOutcomes, VerdictSynthesizer};
pub use throttle::ThrottledInvoker;
pub use transcript::{Interjection, Side, Speech, Transcript};
