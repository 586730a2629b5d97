//! Configuration loading from TOML files.
//!
//! Every section is optional; missing values fall back to the defaults of the
//! push service deployment (`ws://localhost:3001`, namespace `metrics`,
//! 1 s → 30 s backoff, five attempts).

mod logging;
mod reconnect;
mod stream;

pub use logging::LoggingConfig;
pub use reconnect::ReconnectionConfig;
pub use stream::StreamConfig;

use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Environment variable overriding [`StreamConfig::endpoint`].
pub const ENDPOINT_ENV: &str = "PULSEWIRE_ENDPOINT";
/// Environment variable overriding [`StreamConfig::auth_token`].
pub const AUTH_TOKEN_ENV: &str = "PULSEWIRE_AUTH_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stream: StreamConfig,
    pub reconnect: ReconnectionConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load, apply environment overrides and validate a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config from TOML text without touching the environment.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.is_empty()) {
            self.stream.endpoint = endpoint;
        }
        if let Some(token) = lookup(AUTH_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.stream.auth_token = Some(token);
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.stream.validate()?;
        self.reconnect.validate()?;
        Ok(())
    }

    /// Initialize the tracing subscriber from the `[logging]` section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.stream.handshake_timeout_secs, 10);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = Config::parse(
            r#"
            [stream]
            endpoint = "wss://push.example.com"

            [reconnect]
            max_attempts = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.stream.endpoint, "wss://push.example.com");
        assert_eq!(config.stream.namespace, "metrics");
        assert_eq!(config.reconnect.max_attempts, 8);
        assert_eq!(config.reconnect.initial_delay_ms, 1000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = Config::parse("[stream\nendpoint = 1").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn env_overrides_endpoint_and_token() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            ENDPOINT_ENV => Some("wss://override.example.com".into()),
            AUTH_TOKEN_ENV => Some("secret".into()),
            _ => None,
        });

        assert_eq!(config.stream.endpoint, "wss://override.example.com");
        assert_eq!(config.stream.auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env(|_| Some(String::new()));
        assert_eq!(config, Config::default());
    }
}
