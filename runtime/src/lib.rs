//! # Loyalty Runtime
//!
//! Orchestration for loyalty program generation: the retrying requester,
//! the per-driver evaluator, the staged pipeline, prompts, configuration,
//! and the stock observers that turn pipeline events into logs and metrics.
//!
//! ## Example
//!
//! ```no_run
//! use loyalty_core::DriverCatalog;
//! use loyalty_openai::OpenAiClient;
//! use loyalty_runtime::{ProgramPipeline, ServiceConfig, TracingObserver};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::from_env()?;
//! let client = Arc::new(OpenAiClient::from_env()?);
//! let catalog = Arc::new(DriverCatalog::standard().clone());
//!
//! let observer = Arc::new(TracingObserver);
//! let pipeline = ProgramPipeline::from_config(client, &config, catalog, observer);
//! let result = pipeline.run("Brew & Bean Coffee").await?;
//!
//! println!("{}", result.improved.program_name);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod evaluator;
pub mod metrics;
pub mod observers;
pub mod pipeline;
pub mod prompts;
pub mod requester;
pub mod retry;

pub use config::{ConfigError, Environment, ServiceConfig};
pub use evaluator::DriverEvaluator;
pub use observers::{FanoutObserver, MetricsObserver, TracingObserver};
pub use pipeline::{ProgramPipeline, flatten_improvements};
pub use requester::{Recovered, ResilientRequester};
pub use retry::RetryPolicy;
