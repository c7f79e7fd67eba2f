//! Stock [`PipelineObserver`] implementations.

use crate::metrics::{DRIVER_SCORE, LLM_ATTEMPTS, LLM_FAILURES, PIPELINE_DURATION, PIPELINE_RUNS};
use loyalty_core::{PipelineEvent, PipelineObserver};
use std::sync::Arc;

/// Writes every event as a structured `tracing` event.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::RunStarted { business_name } => {
                tracing::info!(business_name = %business_name, "Pipeline run started");
            }
            PipelineEvent::StageEntered { stage } => {
                tracing::info!(stage = stage.as_str(), "Entering {stage}");
            }
            PipelineEvent::AttemptFailed {
                scope,
                attempt,
                error,
                retry_in: Some(delay),
            } => {
                tracing::warn!(
                    stage = scope.stage.as_str(),
                    driver = scope.driver.as_deref(),
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %error,
                    "Request attempt failed, retrying"
                );
            }
            PipelineEvent::AttemptFailed {
                scope,
                attempt,
                error,
                retry_in: None,
            } => {
                tracing::error!(
                    stage = scope.stage.as_str(),
                    driver = scope.driver.as_deref(),
                    attempt,
                    error = %error,
                    "Request failed"
                );
            }
            PipelineEvent::RequestSucceeded { scope, attempts } => {
                tracing::debug!(
                    stage = scope.stage.as_str(),
                    driver = scope.driver.as_deref(),
                    attempts,
                    "Request succeeded"
                );
            }
            PipelineEvent::DriverEvaluated { driver, score } => {
                tracing::info!(driver = %driver, score, "Driver evaluated");
            }
            PipelineEvent::RunCompleted { elapsed } => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                tracing::info!(elapsed_ms, "Pipeline run completed");
            }
            PipelineEvent::RunFailed { stage, error } => {
                tracing::error!(stage = stage.as_str(), error = %error, "Pipeline run failed");
            }
        }
    }
}

/// Records events as `metrics` counters and histograms.
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricsObserver;

impl PipelineObserver for MetricsObserver {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::AttemptFailed { scope, retry_in, .. } => {
                let stage = scope.stage.as_str();
                metrics::counter!(LLM_ATTEMPTS, "stage" => stage, "outcome" => "failure")
                    .increment(1);
                if retry_in.is_none() {
                    metrics::counter!(LLM_FAILURES, "stage" => stage).increment(1);
                }
            }
            PipelineEvent::RequestSucceeded { scope, .. } => {
                metrics::counter!(
                    LLM_ATTEMPTS,
                    "stage" => scope.stage.as_str(),
                    "outcome" => "success"
                )
                .increment(1);
            }
            PipelineEvent::DriverEvaluated { driver, score } => {
                metrics::histogram!(DRIVER_SCORE, "driver" => driver.clone()).record(*score);
            }
            PipelineEvent::RunCompleted { elapsed } => {
                metrics::counter!(PIPELINE_RUNS, "outcome" => "success").increment(1);
                metrics::histogram!(PIPELINE_DURATION).record(elapsed.as_secs_f64());
            }
            PipelineEvent::RunFailed { .. } => {
                metrics::counter!(PIPELINE_RUNS, "outcome" => "failure").increment(1);
            }
            PipelineEvent::RunStarted { .. } | PipelineEvent::StageEntered { .. } => {}
        }
    }
}

/// Forwards each event to several observers in order.
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl FanoutObserver {
    /// Create an empty fan-out
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer
    #[must_use]
    pub fn with(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl std::fmt::Debug for FanoutObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for FanoutObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loyalty_core::Stage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl PipelineObserver for Counting {
        fn on_event(&self, _event: &PipelineEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_fanout_reaches_every_observer() {
        let first = Arc::new(Counting::default());
        let second = Arc::new(Counting::default());
        let fanout = FanoutObserver::new()
            .with(first.clone())
            .with(second.clone())
            .with(Arc::new(TracingObserver))
            .with(Arc::new(MetricsObserver));

        fanout.on_event(&PipelineEvent::StageEntered {
            stage: Stage::AnalyzingGeneral,
        });
        fanout.on_event(&PipelineEvent::DriverEvaluated {
            driver: "time".to_string(),
            score: 7.0,
        });

        assert_eq!(first.0.load(Ordering::SeqCst), 2);
        assert_eq!(second.0.load(Ordering::SeqCst), 2);
    }
}
