//! HTTP handlers for the relay

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::http::{CallKind, HttpClient, HttpExecutor, RequestOptions, UpstreamResponse};
use crate::protocol::ChatRequest;
use crate::providers::openai::{relay_stream, to_completion_payload};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Content type of the relayed completion text
const TEXT_STREAM: &str = "text/plain; charset=utf-8";

/// Shared, read-only state for relay handlers
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn HttpExecutor>,
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(executor: Arc<dyn HttpExecutor>, config: RelayConfig) -> Self {
        Self {
            executor,
            config: Arc::new(config),
        }
    }

    /// State backed by a reqwest [`HttpClient`] for the configured upstream
    pub fn from_config(config: RelayConfig) -> RelayResult<Self> {
        let client = HttpClient::new(&config.upstream)?;
        Ok(Self::new(Arc::new(client), config))
    }
}

/// Build the relay router
pub fn router(state: AppState) -> Router {
    let route = state.config.server.route.clone();
    let body_limit = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route(&route, post(chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Relay one chat turn.
///
/// Upstream successes are re-streamed as plain completion text; upstream
/// failures are passed through with their own status, content type and body.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, RelayError> {
    let options = RequestOptions::new(CallKind::Chat);
    let request_id = options.request_id;
    let payload = to_completion_payload(
        &request,
        &state.config.upstream.model,
        &state.config.defaults,
    );

    info!(
        %request_id,
        history = request.history.len(),
        temperature = payload.temperature,
        max_tokens = payload.max_tokens,
        "Relaying chat request"
    );

    let request_id_header = HeaderValue::from_str(&request_id.to_string())
        .map_err(|e| RelayError::Configuration(e.to_string()))?;

    let mut response = match state.executor.execute_stream(&payload, &options).await? {
        UpstreamResponse::Streaming { body } => {
            let stream = relay_stream(body, state.config.upstream.idle_timeout());
            (
                [(CONTENT_TYPE, HeaderValue::from_static(TEXT_STREAM))],
                Body::from_stream(stream),
            )
                .into_response()
        }
        UpstreamResponse::Failure {
            status,
            content_type,
            body,
        } => {
            let mut response = Response::new(Body::from_stream(body));
            *response.status_mut() = status;
            if let Some(content_type) = content_type {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            response
        }
    };

    response
        .headers_mut()
        .insert("x-request-id", request_id_header);
    Ok(response)
}
