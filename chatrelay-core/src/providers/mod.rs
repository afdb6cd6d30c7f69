//! Upstream provider formats
//!
//! The relay speaks to OpenAI-compatible chat-completions APIs only.

pub mod openai;
