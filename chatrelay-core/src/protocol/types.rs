//! Request types exchanged between the browser-side consumer and the relay
//!
//! The browser sends loosely typed JSON (numbers may arrive as strings, or
//! as empty strings from cleared form fields). These types accept that
//! input as-is and leave numeric coercion to [`NumberLike::coerce`].

use serde::{Deserialize, Serialize};

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions that guide the model's behavior
    System,
    /// User input message
    User,
    /// Assistant (model) response
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// A JSON value that is expected to be numeric but is not guaranteed to be
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl NumberLike {
    /// Numeric value, if the input is a finite number or a string that
    /// trims to one. Empty strings, `null`, booleans and structured values
    /// coerce to `None`.
    pub fn coerce(&self) -> Option<f64> {
        let value = match self {
            NumberLike::Number(n) => *n,
            NumberLike::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
            NumberLike::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for NumberLike {
    fn from(value: f64) -> Self {
        NumberLike::Number(value)
    }
}

impl From<f32> for NumberLike {
    fn from(value: f32) -> Self {
        NumberLike::Number(value as f64)
    }
}

impl From<u32> for NumberLike {
    fn from(value: u32) -> Self {
        NumberLike::Number(value as f64)
    }
}

impl From<&str> for NumberLike {
    fn from(value: &str) -> Self {
        NumberLike::Text(value.to_string())
    }
}

/// Per-assistant generation options sent with every turn
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOptions {
    /// System prompt; `prompt` is accepted for older clients
    #[serde(default, alias = "prompt")]
    pub system_prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<NumberLike>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<NumberLike>,

    /// Number of prior messages the client sends as history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history: Option<u8>,
}

impl AssistantOptions {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: impl Into<NumberLike>) -> Self {
        self.temperature = Some(temperature.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: impl Into<NumberLike>) -> Self {
        self.max_tokens = Some(max_tokens.into());
        self
    }

    pub fn with_max_history(mut self, max_history: u8) -> Self {
        self.max_history = Some(max_history);
        self
    }
}

/// One user turn as posted to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,

    #[serde(default)]
    pub history: Vec<Message>,

    #[serde(default)]
    pub options: AssistantOptions,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            options: AssistantOptions::default(),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_options(mut self, options: AssistantOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults_history_and_options() {
        let request: ChatRequest = serde_json::from_value(json!({ "prompt": "hi" })).unwrap();
        assert_eq!(request.prompt, "hi");
        assert!(request.history.is_empty());
        assert_eq!(request.options, AssistantOptions::default());
    }

    #[test]
    fn test_options_accept_strings_and_legacy_prompt() {
        let options: AssistantOptions = serde_json::from_value(json!({
            "prompt": "be brief",
            "temperature": "0.3",
            "maxTokens": ""
        }))
        .unwrap();

        assert_eq!(options.system_prompt, "be brief");
        assert_eq!(options.temperature.and_then(|t| t.coerce()), Some(0.3));
        assert_eq!(options.max_tokens.and_then(|t| t.coerce()), None);
    }

    #[test]
    fn test_message_roles_serialize_lowercase() {
        let value = serde_json::to_value(Message::assistant("ok")).unwrap();
        assert_eq!(value, json!({ "role": "assistant", "content": "ok" }));
    }

    #[test]
    fn test_unknown_role_rejected() {
        let result: Result<Message, _> =
            serde_json::from_value(json!({ "role": "tool", "content": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_options_serialize_camel_case() {
        let options = AssistantOptions::new("sys")
            .with_temperature(0.5)
            .with_max_tokens(400u32)
            .with_max_history(4);
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(
            value,
            json!({
                "systemPrompt": "sys",
                "temperature": 0.5,
                "maxTokens": 400.0,
                "maxHistory": 4
            })
        );
    }
}
