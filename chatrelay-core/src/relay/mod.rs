//! Relay endpoint
//!
//! An axum router exposing the chat relay route and a health check. Each
//! request is independent: the payload, the upstream call and the
//! per-request fragment filter are owned by the handler invocation.

mod handler;

pub use handler::{chat, health, router, AppState};

use std::future::Future;
use tokio::net::TcpListener;
use tracing::info;

/// Serve the relay on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(
            "Relay listening on http://{}{}",
            addr, state.config.server.route
        );
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
