//! Loyalty program generation server.
//!
//! Run with: cargo run --bin loyalty-server
//! Generate: POST http://localhost:3001/api/generate
//! Health: http://localhost:3001/health
//! Metrics: http://localhost:3001/metrics (when enabled)

use anyhow::Context as _;
use axum::{Router, routing::get};
use loyalty_core::PipelineObserver;
use loyalty_runtime::{
    FanoutObserver, MetricsObserver, ServiceConfig, TracingObserver, metrics,
};
use loyalty_web::{AppState, OpenAiClientFactory, router};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    let config = ServiceConfig::from_env().context("Failed to load configuration")?;
    init_tracing(&config.observability.log_level)?;

    info!(
        environment = %config.environment,
        model = %config.llm.model,
        max_attempts = config.retry.max_attempts,
        "Starting loyalty program server"
    );

    if credential_missing() {
        warn!("OPENAI_API_KEY is not set; generation requests will fail until it is");
    }

    let mut observer = FanoutObserver::new().with(Arc::new(TracingObserver));
    let mut metrics_routes = Router::new();
    if config.observability.metrics_enabled {
        let handle = metrics::install_recorder().context("Failed to install metrics recorder")?;
        observer = observer.with(Arc::new(MetricsObserver));
        metrics_routes = metrics_routes.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        );
        info!("Prometheus metrics enabled at /metrics");
    }

    let clients = Arc::new(OpenAiClientFactory::new(config.llm.clone()));
    let observer: Arc<dyn PipelineObserver> = Arc::new(observer);
    let addr = config.server.socket_addr();
    let app = router(AppState::new(config, clients, observer)).merge(metrics_routes);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .context("Failed to initialize tracing")?;
    Ok(())
}

fn credential_missing() -> bool {
    ["OPENAI_API_KEY", "VITE_OPENAI_API_KEY"]
        .iter()
        .all(|key| std::env::var(key).ok().is_none_or(|value| value.trim().is_empty()))
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, draining connections"),
        Err(err) => {
            error!(error = %err, "Unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
