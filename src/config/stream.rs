//! Push service endpoint configuration.

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Where and how to reach the metrics push service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    /// Base URL of the push service (`ws`, `wss`, `http` or `https`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Namespace appended to the endpoint path.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Upper bound on the WebSocket handshake (seconds).
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
    /// Bearer token sent with the handshake, if the service requires one.
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_endpoint() -> String {
    "ws://localhost:3001".into()
}

fn default_namespace() -> String {
    "metrics".into()
}

const fn default_handshake_timeout_secs() -> u64 {
    10
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            namespace: default_namespace(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            auth_token: None,
        }
    }
}

impl StreamConfig {
    /// Handshake timeout as a [`Duration`].
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Resolve `<endpoint>/<namespace>` as a WebSocket URL.
    ///
    /// `http` and `https` endpoints are mapped to `ws` and `wss`.
    pub fn url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue {
            field: "endpoint",
            reason,
        };

        let mut url = Url::parse(&self.endpoint).map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };
        url.set_scheme(scheme)
            .map_err(|()| invalid(format!("cannot use scheme '{scheme}'")))?;

        url.path_segments_mut()
            .map_err(|()| invalid("endpoint cannot carry a path".into()))?
            .pop_if_empty()
            .push(self.namespace.trim_matches('/'));

        Ok(url)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "endpoint" });
        }
        if self.namespace.trim_matches('/').is_empty() {
            return Err(ConfigError::MissingField { field: "namespace" });
        }
        if self.handshake_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "handshake_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        self.url().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_endpoint(endpoint: &str) -> StreamConfig {
        StreamConfig {
            endpoint: endpoint.into(),
            ..StreamConfig::default()
        }
    }

    #[test]
    fn appends_namespace_to_endpoint() {
        let url = with_endpoint("ws://localhost:3001").url().unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3001/metrics");
    }

    #[test]
    fn keeps_existing_path_prefix() {
        let url = with_endpoint("wss://api.example.com/socket/").url().unwrap();
        assert_eq!(url.as_str(), "wss://api.example.com/socket/metrics");
    }

    #[test]
    fn maps_http_schemes_to_websocket() {
        assert_eq!(
            with_endpoint("http://localhost:3001").url().unwrap().scheme(),
            "ws"
        );
        assert_eq!(
            with_endpoint("https://example.com").url().unwrap().scheme(),
            "wss"
        );
    }

    #[test]
    fn rejects_unknown_scheme() {
        let err = with_endpoint("ftp://example.com").url().unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn rejects_zero_handshake_timeout() {
        let config = StreamConfig {
            handshake_timeout_secs: 0,
            ..StreamConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "handshake_timeout_secs",
                ..
            })
        ));
    }

    #[test]
    fn empty_endpoint_is_missing() {
        assert!(matches!(
            with_endpoint("  ").validate(),
            Err(ConfigError::MissingField { field: "endpoint" })
        ));
    }
}
