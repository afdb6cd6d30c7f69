//! Relay error types and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Result type for relay operations
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while forwarding a chat request upstream
#[derive(Debug, Error)]
pub enum RelayError {
    /// Connecting to or talking with the upstream failed
    #[error("Network error: {0}")]
    Network(String),

    /// No upstream data arrived within the configured window
    #[error("Upstream timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// The upstream body failed mid-stream
    #[error("Upstream stream error: {0}")]
    Stream(String),

    /// The upstream body was not valid UTF-8
    #[error("Failed to decode upstream stream: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RelayError {
    /// Status returned to the browser when this error happens before any
    /// upstream response exists
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Network(_) | RelayError::Stream(_) | RelayError::Decode(_) => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Serialization(_) | RelayError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        RelayError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RelayError::Network("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RelayError::Timeout { secs: 5 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            RelayError::InvalidRequest("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = RelayError::Timeout { secs: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
