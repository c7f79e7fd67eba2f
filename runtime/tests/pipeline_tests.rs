//! Integration tests for the program pipeline
//!
//! Runs whole pipelines against fixture-backed completion clients and checks
//! results, retry behavior, failure propagation and the event stream.

#![allow(clippy::unwrap_used, clippy::panic)] // Test code

use loyalty_core::{
    CompletionError, DriverCatalog, PipelineError, PipelineEvent, RequestScope, Role, Stage,
};
use loyalty_runtime::{ProgramPipeline, ResilientRequester, RetryPolicy};
use loyalty_testing::{RecordingObserver, ScriptedCompletion, StageCompletion, fixtures};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

const BUSINESS: &str = "Brew & Bean Coffee";

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::builder()
        .max_attempts(max_attempts)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(4))
        .multiplier(2.0)
        .build()
}

fn catalog() -> Arc<DriverCatalog> {
    Arc::new(DriverCatalog::standard().clone())
}

fn pipeline(client: Arc<StageCompletion>, observer: Arc<RecordingObserver>) -> ProgramPipeline {
    let requester = ResilientRequester::new(client).with_policy(fast_policy(3));
    ProgramPipeline::new(requester, catalog()).with_observer(observer)
}

#[tokio::test]
async fn test_full_run_produces_complete_result() {
    let client = Arc::new(StageCompletion::new(BUSINESS));
    let observer = Arc::new(RecordingObserver::new());

    let result = pipeline(client.clone(), observer).run(BUSINESS).await.unwrap();

    assert_eq!(result.initial.program_name, "Brew & Bean Coffee Rewards Club");
    assert_eq!(result.improved.program_name, "Brew & Bean Coffee Rewards Club Plus");
    assert!(result.improved.immediate_value.is_some());
    assert_eq!(result.analysis.general.weaknesses.len(), 2);

    let catalog = DriverCatalog::standard();
    assert_eq!(result.analysis.drivers.len(), catalog.len());
    for driver in catalog {
        let evaluation = &result.analysis.drivers[&driver.key];
        let mut expected: Vec<&str> = driver.sub_driver_keys().collect();
        expected.sort_unstable();
        let actual: Vec<&str> = evaluation.sub_driver_analysis.keys().map(String::as_str).collect();
        assert_eq!(actual, expected, "sub-drivers of {}", driver.key);
    }

    // One initial, one analysis, one per driver, one improvement
    assert_eq!(client.calls().len(), catalog.len() + 3);
}

#[tokio::test]
async fn test_every_driver_evaluated_exactly_once() {
    let client = Arc::new(StageCompletion::new(BUSINESS));
    let observer = Arc::new(RecordingObserver::new());

    pipeline(client.clone(), observer).run(BUSINESS).await.unwrap();

    for key in DriverCatalog::standard().keys() {
        assert_eq!(client.calls_for(&RequestScope::driver(key)), 1, "driver {key}");
    }
    assert_eq!(client.evaluated_drivers().len(), 7);
}

#[tokio::test]
async fn test_fenced_output_is_recovered() {
    let client = Arc::new(StageCompletion::new(BUSINESS).fenced());
    let observer = Arc::new(RecordingObserver::new());

    let result = pipeline(client.clone(), observer.clone()).run(BUSINESS).await.unwrap();

    assert_eq!(result.initial.tiers.len(), 3);
    // Fences are cleaned up without spending extra attempts
    assert!(observer.failed_attempts().is_empty());
}

#[tokio::test]
async fn test_transient_timeouts_are_retried() {
    let scope = RequestScope::stage(Stage::GeneratingInitial);
    let client = Arc::new(StageCompletion::new(BUSINESS).script(
        scope.clone(),
        vec![Err(CompletionError::Timeout), Err(CompletionError::Timeout)],
    ));
    let observer = Arc::new(RecordingObserver::new());

    let result = pipeline(client.clone(), observer.clone()).run(BUSINESS).await;

    assert!(result.is_ok());
    assert_eq!(client.calls_for(&scope), 3);
    assert!(observer.events().contains(&PipelineEvent::RequestSucceeded {
        scope: scope.clone(),
        attempts: 3,
    }));
    assert_eq!(
        observer.failed_attempts(),
        vec![(scope.clone(), 1, true), (scope, 2, true)]
    );
}

#[tokio::test]
async fn test_malformed_output_is_retried_then_accepted() {
    let scope = RequestScope::stage(Stage::AnalyzingGeneral);
    let client = Arc::new(StageCompletion::new(BUSINESS).script(
        scope.clone(),
        vec![Ok("Sorry, I cannot produce JSON right now.".to_string())],
    ));
    let observer = Arc::new(RecordingObserver::new());

    let result = pipeline(client.clone(), observer).run(BUSINESS).await.unwrap();

    assert_eq!(client.calls_for(&scope), 2);
    assert!(!result.analysis.general.suggested_improvements.is_empty());
}

#[tokio::test]
async fn test_failing_driver_aborts_run_and_names_driver() {
    let client = Arc::new(StageCompletion::new(BUSINESS).fail_driver(
        "security",
        CompletionError::BadRequest("context length exceeded".to_string()),
    ));
    let observer = Arc::new(RecordingObserver::new());

    let err = pipeline(client.clone(), observer.clone()).run(BUSINESS).await.unwrap_err();

    assert_eq!(err.stage(), Stage::EvaluatingDrivers);
    assert_eq!(err.driver_name(), Some("Security"));
    assert!(err.to_string().contains("Security"));
    match err {
        PipelineError::DriverEvaluation(failure) => {
            assert_eq!(failure.driver_key, "security");
            // Permanent errors are not retried
            assert_eq!(failure.failure.attempts, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // No improvement request without a full set of evaluations
    assert_eq!(
        client.calls_for(&RequestScope::stage(Stage::GeneratingImproved)),
        0
    );
    assert_eq!(
        observer.stages().last(),
        Some(&Stage::Failed)
    );
}

#[tokio::test]
async fn test_sub_driver_mismatch_exhausts_retries() {
    let scope = RequestScope::driver("time");
    let partial = json!({
        "driverScore": 6,
        "overallAssessment": "Partial",
        "subDriverAnalysis": {
            "programDuration": {"score": 6, "strengths": [], "weaknesses": [], "improvements": []}
        }
    })
    .to_string();
    let client = Arc::new(StageCompletion::new(BUSINESS).script(
        scope.clone(),
        vec![Ok(partial.clone()), Ok(partial.clone()), Ok(partial)],
    ));
    let observer = Arc::new(RecordingObserver::new());

    let err = pipeline(client.clone(), observer).run(BUSINESS).await.unwrap_err();

    assert_eq!(err.driver_name(), Some("Time"));
    assert_eq!(client.calls_for(&scope), 3);
}

#[tokio::test]
async fn test_invalid_initial_program_is_not_retried() {
    let scope = RequestScope::stage(Stage::GeneratingInitial);
    let mut program = fixtures::sample_program(BUSINESS);
    program["tiers"] = json!([]);
    let client = Arc::new(
        StageCompletion::new(BUSINESS).script(scope.clone(), vec![Ok(program.to_string())]),
    );
    let observer = Arc::new(RecordingObserver::new());

    let err = pipeline(client.clone(), observer).run(BUSINESS).await.unwrap_err();

    match err {
        PipelineError::InvalidInitialProgram(violation) => {
            assert_eq!(violation.field, "tiers");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn test_observer_sees_stages_in_order() {
    let client = Arc::new(StageCompletion::new(BUSINESS));
    let observer = Arc::new(RecordingObserver::new());

    pipeline(client, observer.clone()).run(BUSINESS).await.unwrap();

    assert_eq!(
        observer.stages(),
        vec![
            Stage::GeneratingInitial,
            Stage::AnalyzingGeneral,
            Stage::EvaluatingDrivers,
            Stage::GeneratingImproved,
            Stage::Complete,
        ]
    );

    let events = observer.events();
    assert_eq!(
        events.first(),
        Some(&PipelineEvent::RunStarted {
            business_name: BUSINESS.to_string()
        })
    );
    assert!(matches!(events.last(), Some(PipelineEvent::RunCompleted { .. })));
    let evaluated = events
        .iter()
        .filter(|event| matches!(event, PipelineEvent::DriverEvaluated { .. }))
        .count();
    assert_eq!(evaluated, 7);
}

#[tokio::test]
async fn test_bounded_concurrency_caps_driver_requests_in_flight() {
    let client = Arc::new(StageCompletion::new(BUSINESS).with_delay(Duration::from_millis(20)));
    let observer = Arc::new(RecordingObserver::new());

    let result = pipeline(client.clone(), observer)
        .with_max_concurrent_drivers(2)
        .run(BUSINESS)
        .await
        .unwrap();

    assert_eq!(result.analysis.drivers.len(), 7);
    assert_eq!(client.peak_in_flight(), 2);
}

#[tokio::test]
async fn test_default_concurrency_evaluates_drivers_together() {
    let client = Arc::new(StageCompletion::new(BUSINESS).with_delay(Duration::from_millis(20)));
    let observer = Arc::new(RecordingObserver::new());

    pipeline(client.clone(), observer).run(BUSINESS).await.unwrap();

    assert_eq!(client.peak_in_flight(), DriverCatalog::standard().len());
}

#[tokio::test]
async fn test_improvement_request_carries_analysis_and_tagged_items() {
    let client = Arc::new(StageCompletion::new(BUSINESS).with_driver_score(4.5));
    let observer = Arc::new(RecordingObserver::new());

    let result = pipeline(client.clone(), observer).run(BUSINESS).await.unwrap();

    for evaluation in result.analysis.drivers.values() {
        assert!((evaluation.driver_score - 4.5).abs() < f64::EPSILON);
    }

    let requests = client.requests_for(&RequestScope::stage(Stage::GeneratingImproved));
    assert_eq!(requests.len(), 1);
    let prompt = &requests[0]
        .messages
        .iter()
        .find(|message| message.role == Role::User)
        .unwrap()
        .content;

    assert!(prompt.contains(BUSINESS));
    for item in ["Tier thresholds are hard to reach", "No digital engagement"] {
        assert!(prompt.contains(item), "weakness {item}");
    }
    for item in ["Lower the Silver threshold", "Add app-based challenges"] {
        assert!(prompt.contains(item), "suggestion {item}");
    }

    let catalog = DriverCatalog::standard();
    let mut expected = Vec::new();
    for driver in catalog {
        for sub in &driver.sub_drivers {
            expected.push(format!("- [{}.{}] Strengthen {}", driver.key, sub.key, sub.name));
        }
    }
    let tagged: Vec<&str> = prompt.lines().filter(|line| line.starts_with("- [")).collect();
    assert_eq!(tagged.len(), 49);
    assert_eq!(tagged, expected);
}

#[tokio::test]
async fn test_retry_budget_bounds_attempts_and_waits_backoff() {
    let policy = RetryPolicy::builder()
        .max_attempts(4)
        .initial_delay(Duration::from_millis(5))
        .max_delay(Duration::from_millis(50))
        .multiplier(2.0)
        .build();
    let client = Arc::new(ScriptedCompletion::new(
        (0..10).map(|_| Err(CompletionError::Timeout)).collect(),
    ));
    let requester = ResilientRequester::new(client.clone()).with_policy(policy.clone());

    let started = Instant::now();
    let failure = requester
        .request(vec![], &RequestScope::stage(Stage::GeneratingInitial))
        .await
        .unwrap_err();

    assert_eq!(failure.attempts, 4);
    assert!(failure.exhausted());
    assert_eq!(client.calls(), 4);
    assert!(started.elapsed() >= policy.total_backoff());
}

#[tokio::test]
async fn test_invalid_improved_program_fails_improvement_stage() {
    let scope = RequestScope::stage(Stage::GeneratingImproved);
    let client = Arc::new(StageCompletion::new(BUSINESS).script(
        scope,
        vec![Ok(json!({"programName": "Half a program"}).to_string())],
    ));
    let observer = Arc::new(RecordingObserver::new());

    let err = pipeline(client, observer.clone()).run(BUSINESS).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidImprovedProgram(_)));
    assert_eq!(err.stage(), Stage::GeneratingImproved);
    assert!(observer.events().iter().any(|event| matches!(
        event,
        PipelineEvent::RunFailed {
            stage: Stage::GeneratingImproved,
            ..
        }
    )));
}
