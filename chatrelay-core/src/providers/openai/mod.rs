//! OpenAI-compatible upstream support
//!
//! Wire types for the chat-completions endpoint, conversion from the
//! relay's request shape, and the SSE relay pipeline.

pub mod converter;
pub mod streaming;
pub mod types;

pub use converter::to_completion_payload;
pub use streaming::{relay_stream, FragmentFilter, FrameOutcome, SkipReason, DONE_MARKER};
pub use types::{CompletionPayload, StreamChunk};
