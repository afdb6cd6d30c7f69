//! Configuration validation utilities

use super::error::ValidationError;
use super::schema::RelayConfig;
use url::Url;

/// Validator layering URL and routing checks on top of
/// [`RelayConfig::validate`]
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        config.validate()?;

        self.validate_base_url(&config.upstream.base_url)?;
        self.validate_route(&config.server.route)?;
        self.validate_bind_addr(&config.server.bind_addr)?;

        Ok(())
    }

    fn validate_base_url(&self, base_url: &str) -> Result<(), ValidationError> {
        let url = Url::parse(base_url)
            .map_err(|e| ValidationError::invalid_url("upstream.base_url", e.to_string()))?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ValidationError::invalid_url(
                "upstream.base_url",
                format!("unsupported scheme '{}'", other),
            )),
        }
    }

    fn validate_route(&self, route: &str) -> Result<(), ValidationError> {
        if !route.starts_with('/') {
            return Err(ValidationError::invalid_format(
                "server.route",
                format!("'{}' must start with '/'", route),
            ));
        }
        if route == "/health" {
            return Err(ValidationError::invalid_format(
                "server.route",
                "'/health' is reserved",
            ));
        }
        Ok(())
    }

    fn validate_bind_addr(&self, bind_addr: &str) -> Result<(), ValidationError> {
        bind_addr
            .parse::<std::net::SocketAddr>()
            .map(|_| ())
            .map_err(|e| ValidationError::invalid_format("server.bind_addr", e.to_string()))
    }
}
