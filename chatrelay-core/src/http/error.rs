//! Mapping of reqwest failures onto [`RelayError`]

use crate::error::RelayError;
use std::time::Duration;
use tracing::{error, warn};
use uuid::Uuid;

/// Map a failure to send the upstream request
pub fn map_transport_error(
    err: reqwest::Error,
    connect_timeout: Duration,
    request_id: Uuid,
) -> RelayError {
    if err.is_timeout() {
        warn!("Upstream request timed out [request_id: {}]", request_id);
        RelayError::Timeout {
            secs: connect_timeout.as_secs(),
        }
    } else if err.is_connect() {
        error!("Upstream connection failed [request_id: {}]: {}", request_id, err);
        RelayError::Network(format!("Connection failed: {} [request_id: {}]", err, request_id))
    } else if err.is_builder() {
        RelayError::Configuration(format!("{} [request_id: {}]", err, request_id))
    } else {
        error!("Upstream request error [request_id: {}]: {}", request_id, err);
        RelayError::Network(format!("{} [request_id: {}]", err, request_id))
    }
}

/// Map a failure while reading the upstream body
pub fn map_body_error(err: reqwest::Error) -> RelayError {
    if err.is_decode() {
        RelayError::Decode(err.to_string())
    } else {
        RelayError::Stream(err.to_string())
    }
}
