//! OpenAI API client implementation

use crate::{
    chat::{ChatRequest, ChatResponse},
    error::CompletionError,
};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a new client with the API key from the environment
    ///
    /// Reads `OPENAI_API_KEY`, falling back to `VITE_OPENAI_API_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::MissingApiKey` if neither variable is set
    pub fn from_env() -> Result<Self, CompletionError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .or_else(|_| std::env::var("VITE_OPENAI_API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(CompletionError::MissingApiKey)?;

        Ok(Self::new(api_key))
    }

    /// Create a new client with explicit API key
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    /// Builder: point the client at another base URL (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Builder: bound every HTTP request by `timeout`
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::RequestFailed` if the HTTP client cannot be built
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, CompletionError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;
        Ok(self)
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Create a chat completion
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, CompletionError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => response
                .json::<ChatResponse>()
                .await
                .map_err(|e| CompletionError::ResponseParseFailed(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(CompletionError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CompletionError::Unauthorized),
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
                let body = response.text().await.unwrap_or_default();
                Err(CompletionError::BadRequest(body))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CompletionError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
        }
    }

    /// Create a chat completion and return only the first choice's text
    ///
    /// # Errors
    ///
    /// Same as [`OpenAiClient::chat`], plus `CompletionError::EmptyResponse`
    /// when the model returned no content and `CompletionError::Truncated`
    /// when it stopped at the token limit.
    pub async fn complete_text(&self, request: &ChatRequest) -> Result<String, CompletionError> {
        let response = self.chat(request).await?;
        if response.is_truncated() {
            return Err(CompletionError::Truncated);
        }
        response.text().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new("test-key".to_string());
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.api_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiClient::new("k".to_string()).with_base_url("http://localhost:9999/v1/");
        assert_eq!(client.api_url(), "http://localhost:9999/v1");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = OpenAiClient::new("sk-secret".to_string());
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}
