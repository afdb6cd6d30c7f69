//! Configuration schema structures with serde support

use super::error::ValidationError;
use super::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fallback sampling temperature when a request carries none
pub const TEMPERATURE: f32 = 0.7;

/// Fallback completion budget when a request carries none
pub const MAX_TOKEN: u32 = 800;

/// Upstream model used when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Root configuration for the relay
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Upstream chat-completions API
    pub upstream: UpstreamConfig,

    /// Listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Generation defaults applied when a request omits a value
    #[serde(default)]
    pub defaults: CompletionDefaults,
}

/// Upstream API settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL; `v1/chat/completions` is appended to it
    pub base_url: String,

    /// Bearer credential (supports `${VAR}` interpolation)
    pub api_key: SecretString,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Longest wait for the next upstream chunk before the relay gives up
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

/// Relay listener settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Route the chat handler is mounted on
    #[serde(default = "default_route")]
    pub route: String,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Values substituted for absent or non-numeric request options
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_route() -> String {
    "/api/chat".to_string()
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_temperature() -> f32 {
    TEMPERATURE
}

fn default_max_tokens() -> u32 {
    MAX_TOKEN
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            route: default_route(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for CompletionDefaults {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKEN,
        }
    }
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<SecretString>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: default_model(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl RelayConfig {
    /// Config with default server settings and generation defaults
    pub fn new(upstream: UpstreamConfig) -> Self {
        Self {
            upstream,
            server: ServerConfig::default(),
            defaults: CompletionDefaults::default(),
        }
    }

    /// Structural checks that need no external state
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(ValidationError::required("upstream.base_url"));
        }
        if self.upstream.api_key.is_empty() {
            return Err(ValidationError::required("upstream.api_key"));
        }
        if self.upstream.model.trim().is_empty() {
            return Err(ValidationError::required("upstream.model"));
        }
        if self.upstream.connect_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "upstream.connect_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.upstream.idle_timeout_secs == 0 {
            return Err(ValidationError::out_of_range(
                "upstream.idle_timeout_secs",
                "must be greater than zero",
            ));
        }
        if !(0.0..=2.0).contains(&self.defaults.temperature) {
            return Err(ValidationError::out_of_range(
                "defaults.temperature",
                format!("{} is outside 0.0..=2.0", self.defaults.temperature),
            ));
        }
        if !(50..=2000).contains(&self.defaults.max_tokens) {
            return Err(ValidationError::out_of_range(
                "defaults.max_tokens",
                format!("{} is outside 50..=2000", self.defaults.max_tokens),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(ValidationError::out_of_range(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RelayConfig {
        RelayConfig::new(UpstreamConfig::new("https://api.example.com/", "sk-test"))
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.upstream.model, "gpt-4o-mini");
        assert_eq!(config.server.route, "/api/chat");
        assert_eq!(config.defaults.temperature, TEMPERATURE);
        assert_eq!(config.defaults.max_tokens, MAX_TOKEN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_api_key() {
        let mut config = config();
        config.upstream.api_key = SecretString::new("");
        let err = config.validate().unwrap_err();
        assert_eq!(err.field_path, "upstream.api_key");
    }

    #[test]
    fn test_default_temperature_range() {
        let mut config = config();
        config.defaults.temperature = 2.5;
        let err = config.validate().unwrap_err();
        assert_eq!(err.field_path, "defaults.temperature");
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let mut config = config();
        config.upstream.idle_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_minimal_yaml() {
        let yaml = r#"
upstream:
  base_url: https://api.example.com/
  api_key: sk-test
"#;
        let config: RelayConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config, self::config());
    }
}
