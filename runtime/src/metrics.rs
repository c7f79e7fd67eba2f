//! Prometheus metrics for pipeline runs and model requests.
//!
//! Metric names:
//! - `loyalty_llm_attempts_total` (labels: `stage`, `outcome`)
//! - `loyalty_llm_failures_total` (labels: `stage`)
//! - `loyalty_pipeline_runs_total` (labels: `outcome`)
//! - `loyalty_pipeline_duration_seconds`
//! - `loyalty_driver_score` (labels: `driver`)
//!
//! # Example
//!
//! ```rust,no_run
//! use loyalty_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! println!("{}", handle.render());
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Attempts made against the completion service
pub const LLM_ATTEMPTS: &str = "loyalty_llm_attempts_total";
/// Requests that failed terminally
pub const LLM_FAILURES: &str = "loyalty_llm_failures_total";
/// Finished pipeline runs
pub const PIPELINE_RUNS: &str = "loyalty_pipeline_runs_total";
/// Pipeline run duration
pub const PIPELINE_DURATION: &str = "loyalty_pipeline_duration_seconds";
/// Driver scores
pub const DRIVER_SCORE: &str = "loyalty_driver_score";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the global Prometheus recorder and return its render handle.
///
/// # Errors
///
/// Returns error if the exporter cannot be built or a recorder is already
/// installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .set_buckets_for_metric(
            Matcher::Full(DRIVER_SCORE.to_string()),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_metrics();
    Ok(handle)
}

/// Register all metric descriptions.
pub fn describe_metrics() {
    describe_counter!(
        LLM_ATTEMPTS,
        "Completion attempts by stage and outcome"
    );
    describe_counter!(
        LLM_FAILURES,
        "Requests that failed after exhausting retries or on a permanent error"
    );
    describe_counter!(PIPELINE_RUNS, "Pipeline runs by outcome");
    describe_histogram!(PIPELINE_DURATION, "Wall-clock time of a pipeline run");
    describe_histogram!(DRIVER_SCORE, "Overall driver scores (1-10)");
}
