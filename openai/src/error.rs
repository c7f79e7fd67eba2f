//! Error types for the OpenAI API client

use thiserror::Error;

/// Errors that can occur when interacting with the Chat Completions API
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CompletionError {
    /// Neither `OPENAI_API_KEY` nor `VITE_OPENAI_API_KEY` is set
    #[error("Missing OPENAI_API_KEY environment variable")]
    MissingApiKey,

    /// The request did not complete within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Could not connect to the API (DNS, TLS, refused connection)
    #[error("Connection failed: {0}")]
    Connection(String),

    /// HTTP request failed for another transport reason
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body did not have the expected shape
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Response contained no message content
    #[error("Response contained no content")]
    EmptyResponse,

    /// The model stopped at the token limit, so the content is incomplete
    #[error("Response truncated at the token limit")]
    Truncated,

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Unauthorized - invalid API key
    #[error("Unauthorized - invalid API key")]
    Unauthorized,

    /// The API rejected the request parameters
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
}

impl CompletionError {
    /// Whether a later attempt with the same request could succeed.
    ///
    /// Network trouble, rate limiting, server-side failures and malformed
    /// responses are transient. Credential and request-shape problems are not.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout
            | Self::Connection(_)
            | Self::RequestFailed(_)
            | Self::ResponseParseFailed(_)
            | Self::EmptyResponse
            | Self::Truncated
            | Self::RateLimited => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::MissingApiKey | Self::Unauthorized | Self::BadRequest(_) => false,
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::ResponseParseFailed(err.to_string())
        } else {
            Self::RequestFailed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CompletionError::Timeout.is_transient());
        assert!(CompletionError::RateLimited.is_transient());
        assert!(CompletionError::Connection("dns".to_string()).is_transient());
        assert!(CompletionError::EmptyResponse.is_transient());
        assert!(CompletionError::Truncated.is_transient());
        assert!(
            CompletionError::ApiError {
                status: 503,
                message: "overloaded".to_string()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_permanent_classification() {
        assert!(!CompletionError::MissingApiKey.is_transient());
        assert!(!CompletionError::Unauthorized.is_transient());
        assert!(!CompletionError::BadRequest("bad model".to_string()).is_transient());
        assert!(
            !CompletionError::ApiError {
                status: 409,
                message: "conflict".to_string()
            }
            .is_transient()
        );
    }
}
