//! Configuration and connection validation commands.

use std::path::Path;

use super::output;
use crate::config::Config;
use crate::error::Result;
use crate::transport::{Transport, WebSocketTransport};

/// Validate a configuration file without connecting.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    output::section("Configuration Check");
    output::field("File", path.display());

    let config = Config::load(path)?;
    output::success("Configuration file is valid");

    output::field("Endpoint", config.stream.url()?);
    output::field(
        "Handshake",
        format!("{}s", config.stream.handshake_timeout_secs),
    );
    output::field(
        "Backoff",
        format!(
            "{}ms to {}ms (x{})",
            config.reconnect.initial_delay_ms,
            config.reconnect.max_delay_ms,
            config.reconnect.backoff_multiplier
        ),
    );
    output::field("Attempts", config.reconnect.max_attempts);

    if config.stream.auth_token.is_some() {
        output::success("Auth token configured");
    } else {
        output::note("No auth token configured; the handshake is unauthenticated");
    }

    Ok(())
}

/// Open and close one WebSocket connection to the push service.
pub async fn execute_connection<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = super::load_config_or_default(config_path.as_ref())?;
    let mut transport = WebSocketTransport::from_config(&config.stream)?;

    output::section("Connection Check");
    output::field("WebSocket", transport.url());
    output::field("Timeout", format!("{}s", config.stream.handshake_timeout_secs));

    match transport.connect().await {
        Ok(()) => output::success("WebSocket connected"),
        Err(e) => {
            output::error("WebSocket connection failed");
            return Err(e);
        }
    }
    transport.close().await;

    output::success("Connection checks passed");
    Ok(())
}
