//! HTTP client implementation using reqwest

use crate::config::{SecretString, UpstreamConfig};
use crate::error::{RelayError, RelayResult};
use crate::http::error::{map_body_error, map_transport_error};
use crate::http::{CallKind, HttpExecutor, RequestOptions, UpstreamResponse};
use crate::providers::openai::CompletionPayload;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default user agent
const USER_AGENT: &str = concat!("chatrelay/", env!("CARGO_PKG_VERSION"));

/// Pooled upstream client bound to one base URL and credential
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    api_key: SecretString,
    connect_timeout: Duration,
    idle_timeout: Duration,
}

impl HttpClient {
    /// Create a client for the configured upstream.
    ///
    /// No total request timeout is set: a generation may stream for a long
    /// time. Waiting for the response head is bounded by the idle timeout,
    /// and the relay bounds silence between body chunks the same way.
    pub fn new(config: &UpstreamConfig) -> RelayResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(config.connect_timeout())
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| RelayError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url(&config.base_url)?,
            api_key: config.api_key.clone(),
            connect_timeout: config.connect_timeout(),
            idle_timeout: config.idle_timeout(),
        })
    }

    /// Full URL for a call kind
    pub fn endpoint(&self, call_kind: CallKind) -> RelayResult<Url> {
        self.base_url
            .join(call_kind.endpoint())
            .map_err(|e| RelayError::Configuration(format!("Invalid endpoint URL: {}", e)))
    }
}

/// Parse the base URL, making sure it ends in `/` so relative joins append
/// instead of replacing the last path segment
fn base_url(raw: &str) -> RelayResult<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| RelayError::Configuration(format!("Invalid upstream base URL: {}", e)))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl HttpExecutor for HttpClient {
    async fn execute_stream(
        &self,
        payload: &CompletionPayload,
        options: &RequestOptions,
    ) -> RelayResult<UpstreamResponse> {
        let request_id = options.request_id;
        let url = self.endpoint(options.call_kind)?;

        info!(
            "Forwarding chat request to {} [model: {}, messages: {}, request_id: {}]",
            url,
            payload.model,
            payload.messages.len(),
            request_id
        );

        let send = self
            .client
            .post(url)
            .bearer_auth(self.api_key.expose_secret())
            .header("X-Request-ID", request_id.to_string())
            .json(payload)
            .send();

        let response = match tokio::time::timeout(self.idle_timeout, send).await {
            Ok(result) => {
                result.map_err(|e| map_transport_error(e, self.connect_timeout, request_id))?
            }
            Err(_) => {
                warn!(
                    "No upstream response within {:?} [request_id: {}]",
                    self.idle_timeout, request_id
                );
                return Err(RelayError::Timeout {
                    secs: self.idle_timeout.as_secs(),
                });
            }
        };

        let status = response.status();
        debug!("Upstream status: {} [request_id: {}]", status, request_id);

        if status.is_success() {
            let body = response.bytes_stream().map(|chunk| chunk.map_err(map_body_error));
            return Ok(UpstreamResponse::Streaming {
                body: Box::pin(body),
            });
        }

        warn!(
            "Upstream returned {}, passing body through [request_id: {}]",
            status, request_id
        );
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(map_body_error));

        Ok(UpstreamResponse::Failure {
            status,
            content_type,
            body: Box::pin(body),
        })
    }
}
