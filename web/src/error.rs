//! Error types for web handlers.
//!
//! Every failure leaves the service as `{ "error": message }` with a status
//! code. Pipeline and configuration failures all collapse to 500; the message
//! carries the diagnostic detail.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_core::{ConfigurationError, PipelineError};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(Json(body): Json<Body>) -> Result<Json<Out>, AppError> {
///     if body.name.trim().is_empty() {
///         return Err(AppError::bad_request("name is required"));
///     }
///     Ok(Json(work(body).await?))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// User-facing message
    message: String,
    /// Internal error, logged but not exposed beyond `message`
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// Status code of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Message sent to the client
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Human-readable error message.
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = ?source,
                    "Request failed"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    "Request failed"
                );
            }
        }

        let body = ErrorResponse {
            error: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        Self::internal(err.to_string()).with_source(err.into())
    }
}

impl From<ConfigurationError> for AppError {
    fn from(err: ConfigurationError) -> Self {
        PipelineError::from(err).into()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("businessName is required");
        assert_eq!(err.to_string(), "[400] businessName is required");
    }

    #[test]
    fn test_configuration_error_is_internal() {
        let err = AppError::from(ConfigurationError::MissingCredential("OPENAI_API_KEY"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message().contains("OPENAI_API_KEY"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_bad_request_is_not_server_error() {
        let err = AppError::bad_request("empty");
        assert!(!err.status().is_server_error());
    }
}
