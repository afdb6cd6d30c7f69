//! Configuration module for the relay
//!
//! Configuration comes either from the process environment
//! ([`RelayConfig::from_env`]) or from a YAML/JSON file whose `${VAR}`
//! placeholders are interpolated before parsing.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use env::{
    interpolate_env_vars, CHATRELAY_BIND, CHATRELAY_CONNECT_TIMEOUT_SECS,
    CHATRELAY_IDLE_TIMEOUT_SECS, CHATRELAY_MODEL, CHATRELAY_ROUTE, END_POINT, OPENAI_API_KEY,
};
pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    CompletionDefaults, RelayConfig, ServerConfig, UpstreamConfig, DEFAULT_MODEL, MAX_TOKEN,
    TEMPERATURE,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let config: RelayConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let config: RelayConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration file, picking the format from its extension
/// (`.json` is JSON, anything else is YAML)
pub fn load_from_path<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_from_json(path),
        _ => load_from_yaml(path),
    }
}

fn read_interpolated(path: &Path) -> ConfigResult<String> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    env::interpolate_env_vars(&content)
}
