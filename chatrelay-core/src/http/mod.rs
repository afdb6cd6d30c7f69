//! HTTP layer for talking to the upstream chat-completions API
//!
//! This module handles:
//! - Endpoint resolution against the configured base URL
//! - Request ID generation and correlation
//! - Splitting upstream responses into streaming successes and raw failures

pub mod client;
pub mod error;

use crate::error::RelayResult;
use crate::providers::openai::CompletionPayload;
use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode};
use bytes::Bytes;
use futures::stream::BoxStream;
use uuid::Uuid;

pub use client::HttpClient;

/// Upstream body as a stream of raw chunks
pub type ByteStream = BoxStream<'static, Result<Bytes, crate::error::RelayError>>;

/// Type of API call being made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Chat completion request
    Chat,
}

impl CallKind {
    /// Endpoint path, relative to the configured base URL
    pub fn endpoint(&self) -> &'static str {
        match self {
            CallKind::Chat => "v1/chat/completions",
        }
    }
}

/// Options for one upstream request
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub call_kind: CallKind,

    /// Correlates relay logs with the upstream `X-Request-ID` header
    pub request_id: Uuid,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new(CallKind::Chat)
    }
}

impl RequestOptions {
    /// Create new request options with a generated request ID
    pub fn new(call_kind: CallKind) -> Self {
        Self {
            call_kind,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Upstream response, split on status
pub enum UpstreamResponse {
    /// 2xx: an SSE body to be relayed
    Streaming { body: ByteStream },

    /// Anything else: forwarded to the browser untouched
    Failure {
        status: StatusCode,
        content_type: Option<HeaderValue>,
        body: ByteStream,
    },
}

impl std::fmt::Debug for UpstreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamResponse::Streaming { .. } => f.write_str("UpstreamResponse::Streaming"),
            UpstreamResponse::Failure { status, .. } => {
                write!(f, "UpstreamResponse::Failure({})", status)
            }
        }
    }
}

/// Executes upstream requests; implemented over reqwest by [`HttpClient`]
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    async fn execute_stream(
        &self,
        payload: &CompletionPayload,
        options: &RequestOptions,
    ) -> RelayResult<UpstreamResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_kind_endpoint_is_relative() {
        assert_eq!(CallKind::Chat.endpoint(), "v1/chat/completions");
        assert!(!CallKind::Chat.endpoint().starts_with('/'));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = RequestOptions::new(CallKind::Chat);
        let b = RequestOptions::default();
        assert_ne!(a.request_id, b.request_id);
    }
}
