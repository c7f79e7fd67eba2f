//! Axum HTTP surface for the loyalty program pipeline.
//!
//! The web layer is a thin shell: it validates the request body, builds a
//! [`ProgramPipeline`](loyalty_runtime::ProgramPipeline) from shared state,
//! runs it under the configured timeout and maps the outcome to JSON.
//!
//! # Routes
//!
//! | Method | Path            | Handler                           |
//! |--------|-----------------|-----------------------------------|
//! | POST   | `/api/generate` | [`handlers::generate`]            |
//! | GET    | `/test`         | [`handlers::test_endpoint`]       |
//! | GET    | `/health`       | [`handlers::health_check`]        |
//!
//! # Example
//!
//! ```ignore
//! use loyalty_web::{AppState, OpenAiClientFactory, router};
//!
//! let config = ServiceConfig::from_env()?;
//! let clients = Arc::new(OpenAiClientFactory::new(config.llm.clone()));
//! let app = router(AppState::new(config, clients, Arc::new(TracingObserver)));
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod state;

pub use error::AppError;
pub use state::{AppState, ClientFactory, OpenAiClientFactory, SharedClientFactory};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(handlers::generate))
        .route("/test", get(handlers::test_endpoint))
        .route("/health", get(handlers::health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
