//! Application state for Axum handlers.
//!
//! The state holds everything a request needs to build a pipeline: the
//! loaded configuration, a way to obtain a completion client, the driver
//! catalog and the observer runs report to. All of it is shared and
//! read-only.

use loyalty_core::{CompletionClient, ConfigurationError, DriverCatalog, PipelineObserver};
use loyalty_openai::{CompletionError, OpenAiClient};
use loyalty_runtime::ServiceConfig;
use loyalty_runtime::config::LlmConfig;
use std::sync::Arc;

/// Source of completion clients.
///
/// Called once per request so a credential added after start-up is picked
/// up without a restart.
pub trait ClientFactory: Send + Sync {
    /// Obtain a client
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] when no client can be built, before any
    /// network call is made.
    fn connect(&self) -> Result<Arc<dyn CompletionClient>, ConfigurationError>;
}

/// Builds [`OpenAiClient`]s from the environment credential.
#[derive(Clone, Debug)]
pub struct OpenAiClientFactory {
    llm: LlmConfig,
}

impl OpenAiClientFactory {
    /// Create a factory applying `llm`'s base URL and timeout
    #[must_use]
    pub const fn new(llm: LlmConfig) -> Self {
        Self { llm }
    }
}

impl ClientFactory for OpenAiClientFactory {
    fn connect(&self) -> Result<Arc<dyn CompletionClient>, ConfigurationError> {
        let client = OpenAiClient::from_env().map_err(|err| match err {
            CompletionError::MissingApiKey => {
                ConfigurationError::MissingCredential("OPENAI_API_KEY")
            }
            other => ConfigurationError::Invalid(other.to_string()),
        })?;

        let client = match &self.llm.api_base {
            Some(base) => client.with_base_url(base.as_str()),
            None => client,
        };
        let client = client
            .with_timeout(self.llm.timeout())
            .map_err(|err| ConfigurationError::Invalid(err.to_string()))?;

        Ok(Arc::new(client))
    }
}

/// Hands out one shared client.
#[derive(Clone)]
pub struct SharedClientFactory {
    client: Arc<dyn CompletionClient>,
}

impl SharedClientFactory {
    /// Share `client` across all requests
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for SharedClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedClientFactory").finish_non_exhaustive()
    }
}

impl ClientFactory for SharedClientFactory {
    fn connect(&self) -> Result<Arc<dyn CompletionClient>, ConfigurationError> {
        Ok(Arc::clone(&self.client))
    }
}

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded service configuration
    pub config: Arc<ServiceConfig>,
    /// Completion client source
    pub clients: Arc<dyn ClientFactory>,
    /// Drivers every program is evaluated on
    pub catalog: Arc<DriverCatalog>,
    /// Receives events from every run
    pub observer: Arc<dyn PipelineObserver>,
}

impl AppState {
    /// Create state with the standard driver catalog
    #[must_use]
    pub fn new(
        config: ServiceConfig,
        clients: Arc<dyn ClientFactory>,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            clients,
            catalog: Arc::new(DriverCatalog::standard().clone()),
            observer,
        }
    }

    /// Replace the driver catalog
    #[must_use]
    pub fn with_catalog(mut self, catalog: Arc<DriverCatalog>) -> Self {
        self.catalog = catalog;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("drivers", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loyalty_core::NoopObserver;
    use loyalty_testing::ScriptedCompletion;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }

    #[test]
    fn test_shared_factory_returns_same_client() {
        let client: Arc<dyn CompletionClient> = Arc::new(ScriptedCompletion::default());
        let factory = SharedClientFactory::new(Arc::clone(&client));

        assert!(matches!(factory.connect(), Ok(found) if Arc::ptr_eq(&found, &client)));
    }

    #[test]
    fn test_state_uses_standard_catalog() {
        let state = AppState::new(
            ServiceConfig::default(),
            Arc::new(SharedClientFactory::new(Arc::new(ScriptedCompletion::default()))),
            Arc::new(NoopObserver),
        );
        assert_eq!(state.catalog.len(), 7);
    }
}
