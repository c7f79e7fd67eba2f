//! The completion service seam
//!
//! Everything above this module talks to the language model through
//! [`CompletionClient`]. Production wires in [`OpenAiClient`]; tests use the
//! fakes from `loyalty-testing`.

use crate::observer::RequestScope;
use async_trait::async_trait;
use loyalty_openai::OpenAiClient;

pub use loyalty_openai::{ChatMessage, ChatRequest, CompletionError, Role};

/// Text generation capability: prompt in, free-form text out.
///
/// The returned text may be fenced, truncated or not JSON at all. Errors are
/// classified by [`CompletionError::is_transient`].
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion.
    ///
    /// `scope` identifies the pipeline stage and driver issuing the request.
    ///
    /// # Errors
    ///
    /// Returns the client's transport or API error.
    async fn complete(
        &self,
        request: ChatRequest,
        scope: &RequestScope,
    ) -> Result<String, CompletionError>;
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        request: ChatRequest,
        _scope: &RequestScope,
    ) -> Result<String, CompletionError> {
        self.complete_text(&request).await
    }
}

/// Model settings applied to every request of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOptions {
    /// Model identifier
    pub model: String,
    /// Sampling temperature, 0.0 to 2.0
    pub temperature: f32,
    /// Output token cap
    pub max_tokens: Option<u32>,
    /// Ask the service for a JSON object response
    pub json_mode: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: loyalty_openai::DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: None,
            json_mode: true,
        }
    }
}

impl CompletionOptions {
    /// Build a chat request for `messages` with these settings
    #[must_use]
    pub fn to_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let mut request = ChatRequest::new(messages)
            .with_model(self.model.clone())
            .with_temperature(self.temperature);
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if self.json_mode {
            request = request.with_json_output();
        }
        request
    }
}
