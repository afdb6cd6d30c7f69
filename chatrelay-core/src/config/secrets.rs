//! Secret handling for the upstream credential
//!
//! The bearer token is wrapped so that `Debug`, `Display` and `tracing`
//! output never contain it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A string whose value is hidden from formatting
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (only for building the outbound header)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    /// Partially redacted form, useful when diagnosing which key is loaded
    pub fn partial_redact(&self) -> String {
        let len = self.value.chars().count();
        if len == 0 {
            return "[EMPTY]".to_string();
        }
        if len <= 8 {
            return "[REDACTED]".to_string();
        }

        let head: String = self.value.chars().take(3).collect();
        let tail: String = self.value.chars().skip(len - 4).collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
