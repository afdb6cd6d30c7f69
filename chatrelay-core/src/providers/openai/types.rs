//! OpenAI chat-completions wire types
//!
//! Only the fields the relay sends or reads are modelled. Stream chunk
//! fields are all optional so that partial or provider-specific chunks
//! still deserialize.

use crate::protocol::Message;
use serde::{Deserialize, Serialize};

/// Body of the upstream `POST v1/chat/completions` request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionPayload {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One `data:` payload of the upstream SSE stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub content: Option<String>,
}

impl StreamChunk {
    /// Content of the first choice's delta, or `""` when any part of the
    /// path is missing
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .and_then(|choice| choice.delta.as_ref())
            .and_then(|delta| delta.content.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_of_first_choice() {
        let chunk: StreamChunk = serde_json::from_str(
            r#"{"choices":[{"delta":{"content":"Hel"}},{"delta":{"content":"ignored"}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), "Hel");
    }

    #[test]
    fn test_missing_paths_default_to_empty() {
        for raw in [
            r#"{}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{}]}"#,
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":null,"finish_reason":"stop"}]}"#,
        ] {
            let chunk: StreamChunk = serde_json::from_str(raw).unwrap();
            assert_eq!(chunk.content(), "", "input: {}", raw);
        }
    }

    #[test]
    fn test_payload_serializes_openai_shape() {
        let payload = CompletionPayload {
            model: "gpt-4o-mini".to_string(),
            messages: vec![Message::user("hi")],
            stream: true,
            temperature: 0.5,
            max_tokens: 100,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["stream"], true);
        assert_eq!(value["max_tokens"], 100);
        assert_eq!(value["messages"][0]["role"], "user");
    }
}
