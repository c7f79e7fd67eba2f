//! The program generation pipeline.
//!
//! A run moves through an explicit state machine:
//!
//! ```text
//! GeneratingInitial → AnalyzingGeneral → EvaluatingDrivers → GeneratingImproved → Complete
//!        └──────────────────┴──────────────────┴────────────────────┴──→ Failed
//! ```
//!
//! Each state carries exactly the data produced so far, so a later stage
//! cannot observe a value that an earlier stage has not produced. Driver
//! evaluations fan out with bounded concurrency and any failure aborts the
//! run; there are no partial results.

use crate::config::ServiceConfig;
use crate::evaluator::DriverEvaluator;
use crate::prompts;
use crate::requester::ResilientRequester;
use futures::{StreamExt, TryStreamExt, stream};
use loyalty_core::{
    AnalysisReport, AnalysisResult, CompletionClient, DriverCatalog, DriverEvaluation,
    LoyaltyProgram, NoopObserver, PipelineError, PipelineEvent, PipelineObserver, PipelineResult,
    RequestScope, Stage, TaggedImprovement, parse_program,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// Data carried between stages.
#[derive(Debug)]
enum RunState {
    GeneratingInitial,
    AnalyzingGeneral {
        initial: LoyaltyProgram,
    },
    EvaluatingDrivers {
        initial: LoyaltyProgram,
        analysis: AnalysisResult,
    },
    GeneratingImproved {
        initial: LoyaltyProgram,
        analysis: AnalysisResult,
        drivers: BTreeMap<String, DriverEvaluation>,
    },
    Complete(PipelineResult),
}

impl RunState {
    const fn stage(&self) -> Stage {
        match self {
            Self::GeneratingInitial => Stage::GeneratingInitial,
            Self::AnalyzingGeneral { .. } => Stage::AnalyzingGeneral,
            Self::EvaluatingDrivers { .. } => Stage::EvaluatingDrivers,
            Self::GeneratingImproved { .. } => Stage::GeneratingImproved,
            Self::Complete(_) => Stage::Complete,
        }
    }
}

/// Generates, analyzes and improves a loyalty program.
#[derive(Clone)]
pub struct ProgramPipeline {
    requester: ResilientRequester,
    catalog: Arc<DriverCatalog>,
    max_concurrent_drivers: usize,
    observer: Arc<dyn PipelineObserver>,
}

impl std::fmt::Debug for ProgramPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramPipeline")
            .field("requester", &self.requester)
            .field("drivers", &self.catalog.len())
            .field("max_concurrent_drivers", &self.max_concurrent_drivers)
            .finish_non_exhaustive()
    }
}

impl ProgramPipeline {
    /// Create a pipeline evaluating every driver of `catalog` at once
    #[must_use]
    pub fn new(requester: ResilientRequester, catalog: Arc<DriverCatalog>) -> Self {
        let max_concurrent_drivers = catalog.len().max(1);
        Self {
            requester,
            catalog,
            max_concurrent_drivers,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Build a pipeline from service configuration
    #[must_use]
    pub fn from_config(
        client: Arc<dyn CompletionClient>,
        config: &ServiceConfig,
        catalog: Arc<DriverCatalog>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        let requester = ResilientRequester::new(client)
            .with_policy(config.retry.policy())
            .with_options(config.llm.completion_options())
            .with_attempt_timeout(config.llm.timeout());
        let limit = config.pipeline.concurrency_for(catalog.len());

        Self::new(requester, catalog)
            .with_max_concurrent_drivers(limit)
            .with_observer(observer)
    }

    /// Bound concurrent driver evaluations (at least 1)
    #[must_use]
    pub fn with_max_concurrent_drivers(mut self, limit: usize) -> Self {
        self.max_concurrent_drivers = limit.max(1);
        self
    }

    /// Report events to `observer`, including request attempts
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.requester = self.requester.with_observer(Arc::clone(&observer));
        self.observer = observer;
        self
    }

    /// Run the pipeline for `business_name`.
    ///
    /// The run is not cancellable from inside; bound it with a timeout.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first stage that fails.
    pub async fn run(&self, business_name: &str) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        self.observer.on_event(&PipelineEvent::RunStarted {
            business_name: business_name.to_string(),
        });

        let mut state = RunState::GeneratingInitial;
        loop {
            let stage = state.stage();
            self.observer.on_event(&PipelineEvent::StageEntered { stage });

            state = match state {
                RunState::Complete(result) => {
                    self.observer.on_event(&PipelineEvent::RunCompleted {
                        elapsed: started.elapsed(),
                    });
                    return Ok(result);
                }
                current => match self.advance(current, business_name).await {
                    Ok(next) => next,
                    Err(err) => {
                        self.observer.on_event(&PipelineEvent::StageEntered {
                            stage: Stage::Failed,
                        });
                        self.observer.on_event(&PipelineEvent::RunFailed {
                            stage,
                            error: err.to_string(),
                        });
                        return Err(err);
                    }
                },
            };
        }
    }

    async fn advance(
        &self,
        state: RunState,
        business_name: &str,
    ) -> Result<RunState, PipelineError> {
        match state {
            RunState::GeneratingInitial => {
                let initial = self.generate_initial(business_name).await?;
                Ok(RunState::AnalyzingGeneral { initial })
            }
            RunState::AnalyzingGeneral { initial } => {
                let analysis = self.analyze(business_name, &initial).await?;
                Ok(RunState::EvaluatingDrivers { initial, analysis })
            }
            RunState::EvaluatingDrivers { initial, analysis } => {
                let drivers = self.evaluate_drivers(&initial).await?;
                Ok(RunState::GeneratingImproved {
                    initial,
                    analysis,
                    drivers,
                })
            }
            RunState::GeneratingImproved {
                initial,
                analysis,
                drivers,
            } => {
                let improvements = flatten_improvements(&self.catalog, &drivers);
                let improved = self.improve(&initial, &analysis, &improvements).await?;
                Ok(RunState::Complete(PipelineResult {
                    initial,
                    analysis: AnalysisReport {
                        general: analysis,
                        drivers,
                    },
                    improved,
                }))
            }
            complete @ RunState::Complete(_) => Ok(complete),
        }
    }

    async fn generate_initial(&self, business_name: &str) -> Result<LoyaltyProgram, PipelineError> {
        let stage = Stage::GeneratingInitial;
        let recovered = self
            .requester
            .request(prompts::initial_program(business_name), &RequestScope::stage(stage))
            .await
            .map_err(|failure| PipelineError::Request { stage, failure })?;

        parse_program(recovered.value).map_err(PipelineError::InvalidInitialProgram)
    }

    async fn analyze(
        &self,
        business_name: &str,
        program: &LoyaltyProgram,
    ) -> Result<AnalysisResult, PipelineError> {
        let stage = Stage::AnalyzingGeneral;
        let recovered = self
            .requester
            .request(
                prompts::general_analysis(business_name, program),
                &RequestScope::stage(stage),
            )
            .await
            .map_err(|failure| PipelineError::Request { stage, failure })?;

        Ok(AnalysisResult::from_value(&recovered.value))
    }

    async fn evaluate_drivers(
        &self,
        program: &LoyaltyProgram,
    ) -> Result<BTreeMap<String, DriverEvaluation>, PipelineError> {
        let evaluator = DriverEvaluator::new(self.requester.clone());

        // Each evaluation owns its inputs; dispatch follows catalog order.
        let evaluations = self.catalog.iter().cloned().map(|driver| {
            let evaluator = evaluator.clone();
            let program = program.clone();
            let observer = Arc::clone(&self.observer);
            async move {
                let evaluation = evaluator.evaluate(&driver, &program).await?;
                observer.on_event(&PipelineEvent::DriverEvaluated {
                    driver: driver.key.clone(),
                    score: evaluation.driver_score,
                });
                Ok::<_, PipelineError>((driver.key, evaluation))
            }
        });

        let drivers: BTreeMap<String, DriverEvaluation> = stream::iter(evaluations)
            .buffer_unordered(self.max_concurrent_drivers)
            .try_collect()
            .await?;

        Ok(drivers)
    }

    async fn improve(
        &self,
        program: &LoyaltyProgram,
        analysis: &AnalysisResult,
        improvements: &[TaggedImprovement],
    ) -> Result<LoyaltyProgram, PipelineError> {
        let stage = Stage::GeneratingImproved;
        let recovered = self
            .requester
            .request(
                prompts::improvement(program, analysis, improvements),
                &RequestScope::stage(stage),
            )
            .await
            .map_err(|failure| PipelineError::Request { stage, failure })?;

        parse_program(recovered.value).map_err(PipelineError::InvalidImprovedProgram)
    }
}

/// Every sub-driver improvement, in catalog order then sub-driver order.
#[must_use]
pub fn flatten_improvements(
    catalog: &DriverCatalog,
    evaluations: &BTreeMap<String, DriverEvaluation>,
) -> Vec<TaggedImprovement> {
    let mut flat = Vec::new();
    for driver in catalog {
        let Some(evaluation) = evaluations.get(&driver.key) else {
            continue;
        };
        for sub_key in driver.sub_driver_keys() {
            let Some(analysis) = evaluation.sub_driver_analysis.get(sub_key) else {
                continue;
            };
            flat.extend(analysis.improvements.iter().map(|text| TaggedImprovement {
                driver_key: driver.key.clone(),
                sub_driver_key: sub_key.to_string(),
                text: text.clone(),
            }));
        }
    }
    flat
}
