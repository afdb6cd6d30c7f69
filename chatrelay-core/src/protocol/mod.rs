//! Protocol module for the relay's request structures
//!
//! These are the shapes the browser-side client posts to the relay. The
//! upstream wire format lives in [`crate::providers::openai::types`].

pub mod types;

pub use types::{AssistantOptions, ChatRequest, Message, MessageRole, NumberLike};
