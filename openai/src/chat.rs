//! Chat Completions request and response types

use crate::error::CompletionError;
use crate::types::{ChatMessage, FinishReason, ResponseFormat, Role};
use serde::{Deserialize, Serialize};

/// Default model for all pipeline calls
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Request to create a chat completion
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ChatRequest {
    /// Model to use (e.g., "gpt-4o-mini")
    pub model: String,
    /// Conversation messages, in order
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Output format hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatRequest {
    /// Create a basic request with sensible defaults
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            messages,
            temperature: None,
            max_tokens: None,
            response_format: None,
        }
    }

    /// Builder: Set model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder: Set temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Builder: Set max tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Builder: Ask for a JSON object response
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.response_format = Some(ResponseFormat::JsonObject);
        self
    }
}

/// Response from creating a chat completion
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    /// Unique identifier for this completion
    pub id: String,
    /// Model that generated the response
    pub model: String,
    /// Generated choices
    pub choices: Vec<Choice>,
}

impl ChatResponse {
    /// Text of the first choice
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::EmptyResponse` when there is no choice or
    /// the first choice has no content.
    pub fn text(&self) -> Result<&str, CompletionError> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }

    /// Whether the first choice was cut off by the token limit
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.choices
            .first()
            .is_some_and(|choice| choice.finish_reason == Some(FinishReason::Length))
    }
}

/// One generated alternative
#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    /// Index of this choice
    pub index: u32,
    /// Generated message
    pub message: ResponseMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Assistant message as returned by the API (content may be null)
#[derive(Clone, Debug, Deserialize)]
pub struct ResponseMessage {
    /// Role (always "assistant" for responses)
    pub role: Role,
    /// Text content
    #[serde(default)]
    pub content: Option<String>,
}
