//! Caller-visible failure values.
//!
//! These are state, not control flow: they land in the client snapshot and in
//! [`ClientEvent`](crate::client::ClientEvent)s instead of being returned.

use std::fmt;

use thiserror::Error;

/// Error code attached to a server `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServerErrorCode {
    /// The subscription payload was rejected.
    InvalidSubscriptionData,
    /// The server failed to collect metrics for a refresh or tick.
    MetricsFetchError,
    /// Any other code, kept verbatim.
    Other(String),
}

impl ServerErrorCode {
    pub const INVALID_SUBSCRIPTION_DATA: &'static str = "INVALID_SUBSCRIPTION_DATA";
    pub const METRICS_FETCH_ERROR: &'static str = "METRICS_FETCH_ERROR";

    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            Self::INVALID_SUBSCRIPTION_DATA => Self::InvalidSubscriptionData,
            Self::METRICS_FETCH_ERROR => Self::MetricsFetchError,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidSubscriptionData => Self::INVALID_SUBSCRIPTION_DATA,
            Self::MetricsFetchError => Self::METRICS_FETCH_ERROR,
            Self::Other(code) => code,
        }
    }

    /// Whether the code invalidates the active subscription.
    #[must_use]
    pub const fn is_subscription_validity(&self) -> bool {
        matches!(self, Self::InvalidSubscriptionData)
    }
}

impl fmt::Display for ServerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol error reported by the push service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ServerError {
    pub code: ServerErrorCode,
    pub message: String,
}

/// Why the client is not (or could not stay) connected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// A connect, handshake or socket failure; retried with backoff.
    #[error("transport error: {0}")]
    Transport(String),

    /// The retry ceiling was reached; no reconnect is scheduled.
    #[error("gave up after {attempts} reconnection attempts")]
    Exhausted { attempts: u32 },
}

impl ConnectionError {
    /// Whether the client stopped retrying.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}
