//! Engine entry point: run the four layers, then synthesize.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::annotation::AnnotationLayer;
use crate::audit::AuditLayer;
use crate::config::AdjudicationConfig;
use crate::engagement::EngagementLayer;
use crate::error::AdjudicationResult;
use crate::layer::{LayerKind, LayerOutcome};
use crate::oracle::ReasoningOracle;
use crate::report::render_report;
use crate::rubric::RubricLayer;
use crate::synthesis::{DivisionResult, LayerOutcomes, VerdictSynthesizer};
use crate::throttle::ThrottledInvoker;
use crate::transcript::Transcript;

/// A finished adjudication: the structured result and its report.
#[derive(Debug, Clone)]
pub struct Adjudication {
    pub division: DivisionResult,
    pub report: String,
}

/// Runs the layers sequentially (1, 2a, 2b, 3) against one shared oracle
/// and throttle.
pub struct Adjudicator {
    rubric: RubricLayer,
    annotation: AnnotationLayer,
    engagement: EngagementLayer,
    audit: AuditLayer,
    synthesizer: VerdictSynthesizer,
}

impl Adjudicator {
    pub fn new(
        oracle: Arc<dyn ReasoningOracle>,
        config: &AdjudicationConfig,
    ) -> AdjudicationResult<Self> {
        config.validate()?;
        let invoker = ThrottledInvoker::from_config(config);
        Ok(Self {
            rubric: RubricLayer::new(
                oracle.clone(),
                invoker.clone(),
                config.scoring_temperature,
                config.rubric_tie_break,
            ),
            annotation: AnnotationLayer::new(
                oracle.clone(),
                invoker.clone(),
                config.scoring_temperature,
                config.annotation_tie_break,
            ),
            engagement: EngagementLayer::new(
                oracle.clone(),
                invoker.clone(),
                config.engagement_judges,
                config.judge_temperature,
                config.engagement_tie_break,
            ),
            audit: AuditLayer::new(oracle, invoker, config.scoring_temperature),
            synthesizer: VerdictSynthesizer::new(config.no_verdict),
        })
    }

    /// Adjudicate one transcript.
    ///
    /// Layer failures are recorded, not returned. Errors are limited to an
    /// invalid transcript and
    /// [`NoVerdictPossible`](crate::error::AdjudicationError::NoVerdictPossible).
    pub async fn adjudicate(&self, transcript: &Transcript) -> AdjudicationResult<Adjudication> {
        transcript.validate()?;
        info!(
            motion = %transcript.motion,
            speeches = transcript.speeches.len(),
            interjections = transcript.interjections.len(),
            "Starting adjudication"
        );

        let rubric = run_layer(LayerKind::Rubric, self.rubric.evaluate(transcript)).await;
        let annotation =
            run_layer(LayerKind::Annotation, self.annotation.evaluate(transcript)).await;
        let engagement =
            run_layer(LayerKind::Engagement, self.engagement.evaluate(transcript)).await;
        let audit = run_layer(LayerKind::Audit, self.audit.evaluate(transcript)).await;

        let division = self.synthesizer.synthesize(
            &transcript.motion,
            LayerOutcomes {
                rubric,
                annotation,
                engagement,
                audit,
            },
        )?;
        let report = render_report(&division);

        info!(
            adjudication_id = %division.adjudication_id,
            winner = %division.winner,
            margin = %division.margin,
            "Adjudication complete"
        );
        Ok(Adjudication { division, report })
    }
}

async fn run_layer<T, F>(layer: LayerKind, evaluation: F) -> LayerOutcome<T>
where
    F: Future<Output = AdjudicationResult<T>>,
{
    let outcome = LayerOutcome::from_result(layer, evaluation.await);
    if let Some(failure) = outcome.failure() {
        warn!(layer = %layer, error = %failure.error, "Layer failed; continuing");
    }
    outcome
}
