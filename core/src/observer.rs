//! Pipeline stages and the diagnostic event stream
//!
//! The pipeline never logs directly. It reports what happens through a
//! [`PipelineObserver`] supplied by the caller, which keeps the orchestration
//! logic free of I/O and lets tests assert on the exact event sequence.

use std::fmt;
use std::time::Duration;

/// States of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Generating the first program from the business name
    GeneratingInitial,
    /// General weakness/improvement analysis
    AnalyzingGeneral,
    /// Per-driver evaluations
    EvaluatingDrivers,
    /// Synthesizing the improved program
    GeneratingImproved,
    /// Result assembled
    Complete,
    /// Terminal failure
    Failed,
}

impl Stage {
    /// Stable snake_case identifier (log fields, metric labels)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GeneratingInitial => "generating_initial",
            Self::AnalyzingGeneral => "analyzing_general",
            Self::EvaluatingDrivers => "evaluating_drivers",
            Self::GeneratingImproved => "generating_improved",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions happen
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::GeneratingInitial => "initial generation",
            Self::AnalyzingGeneral => "general analysis",
            Self::EvaluatingDrivers => "driver evaluation",
            Self::GeneratingImproved => "improvement",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Which stage (and driver) a completion request belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestScope {
    /// Issuing stage
    pub stage: Stage,
    /// Catalog key of the driver under evaluation
    pub driver: Option<String>,
}

impl RequestScope {
    /// Scope for a stage-level request
    #[must_use]
    pub const fn stage(stage: Stage) -> Self {
        Self {
            stage,
            driver: None,
        }
    }

    /// Scope for a driver evaluation request
    #[must_use]
    pub fn driver(key: impl Into<String>) -> Self {
        Self {
            stage: Stage::EvaluatingDrivers,
            driver: Some(key.into()),
        }
    }
}

/// Structured diagnostic event.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineEvent {
    /// A run started
    RunStarted {
        /// Business the program is generated for
        business_name: String,
    },
    /// The run moved into a stage
    StageEntered {
        /// New stage
        stage: Stage,
    },
    /// A request attempt failed
    AttemptFailed {
        /// Request scope
        scope: RequestScope,
        /// 1-based attempt number
        attempt: u32,
        /// Error description
        error: String,
        /// Backoff before the next attempt, `None` when giving up
        retry_in: Option<Duration>,
    },
    /// A request produced usable data
    RequestSucceeded {
        /// Request scope
        scope: RequestScope,
        /// Attempts it took
        attempts: u32,
    },
    /// A driver evaluation finished
    DriverEvaluated {
        /// Catalog key
        driver: String,
        /// Overall driver score
        score: f64,
    },
    /// The run produced a result
    RunCompleted {
        /// Wall-clock duration of the run
        elapsed: Duration,
    },
    /// The run failed
    RunFailed {
        /// Stage that failed
        stage: Stage,
        /// Error description
        error: String,
    },
}

/// Receives pipeline events. Implementations must be cheap and non-blocking.
pub trait PipelineObserver: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &PipelineEvent);
}

/// Observer that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {
    fn on_event(&self, _event: &PipelineEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        assert_eq!(Stage::EvaluatingDrivers.as_str(), "evaluating_drivers");
        assert_eq!(Stage::GeneratingInitial.to_string(), "initial generation");
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::AnalyzingGeneral.is_terminal());
    }

    #[test]
    fn test_driver_scope() {
        let scope = RequestScope::driver("access");
        assert_eq!(scope.stage, Stage::EvaluatingDrivers);
        assert_eq!(scope.driver.as_deref(), Some("access"));
    }
}
