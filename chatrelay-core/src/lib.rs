//! Chatrelay Core Library
//!
//! A streaming relay between a chat client and an OpenAI-compatible
//! chat-completions API, plus the client-side pieces that drive it:
//!
//! - [`relay`]: axum endpoint that forwards a chat turn upstream and streams
//!   back plain text fragments
//! - [`consumer`]: reads that text stream and reports the accumulated reply
//! - [`assistant`] and [`session`]: persisted presets and conversation logs

pub mod assistant;
pub mod config;
pub mod consumer;
pub mod error;
pub mod http;
pub mod protocol;
pub mod providers;
pub mod relay;
pub mod session;
pub mod storage;

pub use config::RelayConfig;
pub use consumer::{CompletionCallbacks, StreamConsumer, StreamOutcome};
pub use error::{RelayError, RelayResult};
pub use protocol::{AssistantOptions, ChatRequest, Message, MessageRole};
pub use relay::{router, serve, AppState};

/// Returns the version of the Chatrelay Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
