//! Environment handling: `${VAR}` interpolation for config files and
//! the process-environment configuration used by the relay binary

use super::error::ConfigError;
use super::schema::{RelayConfig, UpstreamConfig};
use regex::Regex;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Upstream base URL
pub const END_POINT: &str = "END_POINT";
/// Upstream bearer credential
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const CHATRELAY_MODEL: &str = "CHATRELAY_MODEL";
pub const CHATRELAY_BIND: &str = "CHATRELAY_BIND";
pub const CHATRELAY_ROUTE: &str = "CHATRELAY_ROUTE";
pub const CHATRELAY_CONNECT_TIMEOUT_SECS: &str = "CHATRELAY_CONNECT_TIMEOUT_SECS";
pub const CHATRELAY_IDLE_TIMEOUT_SECS: &str = "CHATRELAY_IDLE_TIMEOUT_SECS";

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
    })
}

/// Replace every `${VAR}` reference in `content` with the variable's value.
///
/// Fails on the first variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = content.to_string();

    for cap in env_var_pattern().captures_iter(content) {
        let var_name = &cap[1];
        let value = env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound {
            var: var_name.to_string(),
        })?;
        result = result.replace(&cap[0], &value);
    }

    Ok(result)
}

impl RelayConfig {
    /// Build the relay configuration from the process environment.
    ///
    /// `END_POINT` and `OPENAI_API_KEY` are required; the `CHATRELAY_*`
    /// variables override the defaults when present.
    ///
    /// The environment is read once, here. A relay built from the result keeps
    /// these values for its lifetime; later changes to the process
    /// environment are not picked up.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = required(END_POINT)?;
        let api_key = required(OPENAI_API_KEY)?;

        let mut upstream = UpstreamConfig::new(base_url, api_key);
        if let Some(model) = optional(CHATRELAY_MODEL) {
            upstream.model = model;
        }
        if let Some(secs) = parsed::<u64>(CHATRELAY_CONNECT_TIMEOUT_SECS)? {
            upstream.connect_timeout_secs = secs;
        }
        if let Some(secs) = parsed::<u64>(CHATRELAY_IDLE_TIMEOUT_SECS)? {
            upstream.idle_timeout_secs = secs;
        }

        let mut config = RelayConfig::new(upstream);
        if let Some(bind) = optional(CHATRELAY_BIND) {
            config.server.bind_addr = bind;
        }
        if let Some(route) = optional(CHATRELAY_ROUTE) {
            config.server.route = route;
        }

        super::ConfigValidator::new().validate(&config)?;
        Ok(config)
    }
}

fn required(var: &str) -> Result<String, ConfigError> {
    optional(var).ok_or_else(|| ConfigError::EnvVarNotFound {
        var: var.to_string(),
    })
}

fn optional(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T>(var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(var)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::EnvVarInvalid {
                var: var.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}
