//! Liveness endpoints.
//!
//! Neither endpoint touches the completion service.

use axum::{Json, http::StatusCode};
use serde_json::{Value, json};

/// Simple health check endpoint (for basic liveness).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Static acknowledgement that the API is reachable.
///
/// # Endpoint
///
/// ```text
/// GET /test
/// ```
///
/// # Response
///
/// ```json
/// { "message": "API is working!" }
/// ```
#[allow(clippy::unused_async)]
pub async fn test_endpoint() -> Json<Value> {
    Json(json!({ "message": "API is working!" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_test_endpoint_message() {
        let Json(body) = test_endpoint().await;
        assert_eq!(body["message"], "API is working!");
    }
}
