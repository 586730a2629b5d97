//! Duplex event channel to the push service.
//!
//! [`Transport`] is the seam between the client state machine and the
//! network. [`WebSocketTransport`] is the production implementation; the
//! `testkit` module provides scripted ones.

mod websocket;

pub use websocket::WebSocketTransport;

use std::fmt;

use async_trait::async_trait;

use crate::error::Error;
use crate::protocol::{ClientCommand, ServerEvent};

/// Why a live connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the connection.
    ServerInitiated(String),
    /// The caller asked to close it (`stop()`).
    ClientInitiated,
    /// The stream ended without a close frame.
    TransportClosed,
    /// A socket error tore the connection down.
    TransportError(String),
}

impl DisconnectReason {
    /// Every close except a caller-initiated one is followed by a reconnect.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        !matches!(self, Self::ClientInitiated)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerInitiated(reason) if reason.is_empty() => {
                f.write_str("server disconnect")
            }
            Self::ServerInitiated(reason) => write!(f, "server disconnect: {reason}"),
            Self::ClientInitiated => f.write_str("client disconnect"),
            Self::TransportClosed => f.write_str("transport close"),
            Self::TransportError(err) => write!(f, "transport error: {err}"),
        }
    }
}

/// Something that happened on a live connection.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Message(ServerEvent),
    Closed(DisconnectReason),
}

/// A single duplex connection to the push service.
///
/// Implementations own at most one socket. `connect` replaces any previous
/// socket; `close` is idempotent.
#[async_trait]
pub trait Transport: Send {
    /// Open the connection, bounded by the handshake timeout.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Send one command over the live connection.
    async fn send(&mut self, command: &ClientCommand) -> Result<(), Error>;

    /// Receive the next event.
    ///
    /// Must be cancel-safe: the client polls it inside `select!`. Returns
    /// `None` when there is no live connection.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Close the connection if one is open.
    async fn close(&mut self);

    /// Endpoint description for logging.
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl Transport for Box<dyn Transport> {
    async fn connect(&mut self) -> Result<(), Error> {
        (**self).connect().await
    }

    async fn send(&mut self, command: &ClientCommand) -> Result<(), Error> {
        (**self).send(command).await
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        (**self).next_event().await
    }

    async fn close(&mut self) {
        (**self).close().await;
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}
