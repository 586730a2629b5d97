//! Integration tests for loading configuration files.

mod support;

use std::time::Duration;

use pulsewire::config::Config;
use pulsewire::error::{ConfigError, Error};
use pulsewire::transport::{Transport, WebSocketTransport};

use support::config_file;

#[test]
fn loads_full_config_file() {
    let file = config_file(
        r#"
        [stream]
        endpoint = "https://push.example.com"
        namespace = "/metrics/"
        handshake_timeout_secs = 5

        [reconnect]
        initial_delay_ms = 500
        max_delay_ms = 4000
        backoff_multiplier = 3.0
        max_attempts = 3

        [logging]
        level = "debug"
        format = "json"
        "#,
    );

    let config = Config::load(file.path()).unwrap();

    assert_eq!(
        config.stream.url().unwrap().as_str(),
        "wss://push.example.com/metrics"
    );
    assert_eq!(config.stream.handshake_timeout(), Duration::from_secs(5));
    assert_eq!(config.reconnect.delay_for(0), Duration::from_millis(500));
    assert_eq!(config.reconnect.delay_for(1), Duration::from_millis(1500));
    assert_eq!(config.reconnect.delay_for(5), Duration::from_millis(4000));
    assert_eq!(config.reconnect.max_attempts, 3);
    assert_eq!(config.logging.format, "json");
}

#[test]
fn transport_built_from_loaded_config() {
    let file = config_file(
        r#"
        [stream]
        endpoint = "ws://127.0.0.1:3001"
        "#,
    );
    let config = Config::load(file.path()).unwrap();

    let transport = WebSocketTransport::from_config(&config.stream).unwrap();
    assert_eq!(transport.endpoint(), "ws://127.0.0.1:3001/metrics");
}

#[test]
fn missing_file_is_read_error() {
    let err = Config::load("/nonexistent/pulsewire.toml").unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::ReadFile(_))));
}

#[test]
fn inverted_backoff_bounds_are_rejected() {
    let file = config_file(
        r#"
        [reconnect]
        initial_delay_ms = 60000
        max_delay_ms = 1000
        "#,
    );

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "initial_delay_ms",
            ..
        })
    ));
}

#[test]
fn unsupported_scheme_is_rejected() {
    let file = config_file(
        r#"
        [stream]
        endpoint = "ftp://push.example.com"
        "#,
    );

    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "endpoint",
            ..
        })
    ));
}

#[test]
fn zero_handshake_timeout_is_rejected() {
    let file = config_file(
        r#"
        [stream]
        handshake_timeout_secs = 0
        "#,
    );

    assert!(Config::load(file.path()).is_err());
}
