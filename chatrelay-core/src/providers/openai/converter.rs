//! Conversion from a relay [`ChatRequest`] to the upstream payload

use super::types::CompletionPayload;
use crate::config::CompletionDefaults;
use crate::protocol::{ChatRequest, Message, NumberLike};

/// Build the upstream request for one chat turn.
///
/// Messages are `system`, then the supplied history, then the new user
/// prompt. Temperature and max tokens fall back to `defaults` when the
/// option is absent, empty or not numeric.
pub fn to_completion_payload(
    request: &ChatRequest,
    model: &str,
    defaults: &CompletionDefaults,
) -> CompletionPayload {
    let mut messages = Vec::with_capacity(request.history.len() + 2);
    messages.push(Message::system(request.options.system_prompt.clone()));
    messages.extend(request.history.iter().cloned());
    messages.push(Message::user(request.prompt.clone()));

    CompletionPayload {
        model: model.to_string(),
        messages,
        stream: true,
        temperature: coerce_temperature(request.options.temperature.as_ref(), defaults),
        max_tokens: coerce_max_tokens(request.options.max_tokens.as_ref(), defaults),
    }
}

fn coerce_temperature(value: Option<&NumberLike>, defaults: &CompletionDefaults) -> f32 {
    value
        .and_then(NumberLike::coerce)
        .map(|t| t as f32)
        .unwrap_or(defaults.temperature)
}

fn coerce_max_tokens(value: Option<&NumberLike>, defaults: &CompletionDefaults) -> u32 {
    value
        .and_then(NumberLike::coerce)
        .filter(|n| *n >= 1.0)
        .map(|n| n.trunc().min(u32::MAX as f64) as u32)
        .unwrap_or(defaults.max_tokens)
}
