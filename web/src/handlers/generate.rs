//! Program generation endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use loyalty_core::{PipelineEvent, PipelineObserver, PipelineResult, Stage};
use loyalty_runtime::ProgramPipeline;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Instrument;
use uuid::Uuid;

/// Body of `POST /api/generate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Business to design a program for
    #[serde(default)]
    pub business_name: Option<String>,
}

/// Generate, analyze and improve a loyalty program.
///
/// # Endpoint
///
/// ```text
/// POST /api/generate
/// { "businessName": "Brew & Bean Coffee" }
/// ```
///
/// # Errors
///
/// - 400 when the body is not JSON or the business name is missing or blank
/// - 500 for a missing credential, any pipeline failure, or a run that
///   exceeds the configured pipeline timeout
pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<PipelineResult>, AppError> {
    let Json(request) = body.map_err(|rejection| {
        AppError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    })?;
    let business_name = request
        .business_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AppError::bad_request("Business name is required"))?
        .to_string();

    let client = state.clients.connect()?;
    let tracker = Arc::new(StageTracker::new(state.observer.clone()));
    let pipeline = ProgramPipeline::from_config(
        client,
        &state.config,
        state.catalog.clone(),
        tracker.clone(),
    );

    let run_id = Uuid::new_v4();
    let limit = state.config.pipeline.timeout();
    let span = tracing::info_span!("generate", %run_id, business = %business_name);

    let outcome = tokio::time::timeout(limit, pipeline.run(&business_name))
        .instrument(span)
        .await
        .map_err(|_| {
            let error = format!("Program generation timed out after {}s", limit.as_secs());
            tracker.abandon(&error);
            AppError::internal(error)
        })?;

    Ok(Json(outcome?))
}

/// Forwards events while remembering the last stage entered, so a run
/// dropped by the timeout can still report where it stopped.
struct StageTracker {
    inner: Arc<dyn PipelineObserver>,
    current: Mutex<Stage>,
}

impl StageTracker {
    fn new(inner: Arc<dyn PipelineObserver>) -> Self {
        Self {
            inner,
            current: Mutex::new(Stage::GeneratingInitial),
        }
    }

    fn abandon(&self, error: &str) {
        let stage = *self.current.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.on_event(&PipelineEvent::StageEntered {
            stage: Stage::Failed,
        });
        self.inner.on_event(&PipelineEvent::RunFailed {
            stage,
            error: error.to_string(),
        });
    }
}

impl PipelineObserver for StageTracker {
    fn on_event(&self, event: &PipelineEvent) {
        if let PipelineEvent::StageEntered { stage } = event {
            *self.current.lock().unwrap_or_else(PoisonError::into_inner) = *stage;
        }
        self.inner.on_event(event);
    }
}
