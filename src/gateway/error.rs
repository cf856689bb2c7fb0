//! Gateway error type and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Errors raised while forwarding a request.
///
/// Every variant maps to a 500 at the handler boundary; the variants exist
/// so logs say which phase failed.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Upstream could not be reached or the response body could not be read.
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Inbound body declared as JSON did not parse.
    #[error("invalid JSON request body: {0}")]
    InboundJson(#[source] serde_json::Error),

    /// Upstream declared JSON but sent something else.
    #[error("invalid JSON from upstream: {0}")]
    UpstreamJson(#[source] serde_json::Error),

    /// Inbound multipart form could not be parsed.
    #[error("invalid multipart body: {0}")]
    Multipart(String),

    /// Inbound body could not be read (limit exceeded, connection reset).
    #[error("failed to read request body: {0}")]
    Body(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    /// Status code reported to the caller.
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "message": "Gateway failed to process the request",
            "detail": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

/// Build a JSON `{"message": ...}` response with the given status.
pub fn message_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "message": message.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_maps_to_500_json() {
        let err = GatewayError::Multipart("missing boundary".into());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["message"].is_string());
        assert!(json["detail"].as_str().unwrap().contains("missing boundary"));
    }

    #[test]
    fn test_error_display() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = GatewayError::InboundJson(parse_err);
        assert!(err.to_string().starts_with("invalid JSON request body"));
    }
}
