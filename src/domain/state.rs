//! Connection lifecycle state and counters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of the single push-service connection.
///
/// `Connected` and `Subscribed` both imply a live socket; only `Subscribed`
/// means the server acknowledged the active subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Subscribed,
}

impl ConnectionState {
    /// Whether a live socket exists.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected | Self::Subscribed)
    }

    #[must_use]
    pub const fn is_subscribed(self) -> bool {
        matches!(self, Self::Subscribed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Subscribed => "subscribed",
        };
        f.write_str(name)
    }
}

/// Counters kept for the lifetime of one client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    /// Reconnection attempts since the last successful connect.
    pub reconnect_attempts: u32,
    pub last_connected_at: Option<DateTime<Utc>>,
    pub last_update_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_live_states_are_connected() {
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Connected.is_connected());
        assert!(ConnectionState::Subscribed.is_connected());
    }

    #[test]
    fn only_subscribed_is_subscribed() {
        assert!(ConnectionState::Subscribed.is_subscribed());
        assert!(!ConnectionState::Connected.is_subscribed());
    }

    #[test]
    fn displays_lowercase_name() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }
}
