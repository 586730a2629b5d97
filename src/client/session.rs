//! The client state machine.
//!
//! [`Session`] combines the connection manager, the subscription tracker and
//! the update sink. It is a pure, synchronous state machine: callers feed it
//! requests and transport events and execute the returned [`Action`]s in
//! order. The async client task in [`handle`](super::handle) is one such
//! executor; tests drive it directly.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::connection::ConnectionManager;
use super::sink::UpdateSink;
use super::tracker::SubscriptionTracker;
use crate::config::ReconnectionConfig;
use crate::domain::{
    ConnectionError, ConnectionState, ConnectionStats, InboundUpdate, ServerError,
    SubscriptionDescriptor,
};
use crate::protocol::{ClientCommand, ServerEvent};
use crate::transport::{DisconnectReason, TransportEvent};

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Open the transport. Report the outcome with
    /// [`Session::on_open`] or [`Session::on_connect_error`].
    Connect,
    Send(ClientCommand),
    Close,
    /// Arm the single reconnect timer, replacing any armed one.
    ArmTimer(Duration),
    CancelTimer,
    Emit(ClientEvent),
}

/// Notification for observers of the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected,
    Disconnected {
        reason: DisconnectReason,
    },
    ReconnectScheduled {
        attempt: u32,
        delay: Duration,
    },
    ConnectionError(ConnectionError),
    SubscriptionConfirmed(SubscriptionDescriptor),
    /// The server refused the active descriptor; it is still held.
    SubscriptionRejected {
        descriptor: SubscriptionDescriptor,
        error: ServerError,
    },
    Unsubscribed,
    ServerError(ServerError),
    Update(InboundUpdate),
}

/// Point-in-time view of the client, as published to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientSnapshot {
    pub state: ConnectionState,
    pub descriptor: Option<SubscriptionDescriptor>,
    /// Set when the server rejected `descriptor`.
    pub rejected: bool,
    pub latest_update: Option<InboundUpdate>,
    #[serde(serialize_with = "serialize_display")]
    pub connection_error: Option<ConnectionError>,
    #[serde(serialize_with = "serialize_display")]
    pub server_error: Option<ServerError>,
    pub stats: ConnectionStats,
    pub reconnect_pending: bool,
}

impl ClientSnapshot {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.state.is_subscribed()
    }
}

fn serialize_display<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: serde::Serializer,
{
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

pub struct Session {
    connection: ConnectionManager,
    subscriptions: SubscriptionTracker,
    sink: UpdateSink,
    server_error: Option<ServerError>,
}

impl Session {
    #[must_use]
    pub fn new(config: ReconnectionConfig) -> Self {
        Self {
            connection: ConnectionManager::new(config),
            subscriptions: SubscriptionTracker::default(),
            sink: UpdateSink::default(),
            server_error: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.state().is_connected()
    }

    #[must_use]
    pub const fn descriptor(&self) -> Option<&SubscriptionDescriptor> {
        self.subscriptions.current()
    }

    #[must_use]
    pub const fn stats(&self) -> &ConnectionStats {
        self.connection.stats()
    }

    #[must_use]
    pub const fn reconnect_timer(&self) -> Option<Duration> {
        self.connection.reconnect_timer()
    }

    pub fn start(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        self.connection.start(&mut out);
        out
    }

    pub fn stop(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        self.connection.stop(&mut out);
        out
    }

    pub fn subscribe(&mut self, descriptor: SubscriptionDescriptor) -> Vec<Action> {
        let mut out = Vec::new();
        if self.subscriptions.current() != Some(&descriptor) {
            self.server_error = None;
        }
        self.subscriptions
            .subscribe(descriptor, &mut self.connection, &mut out);
        out
    }

    pub fn unsubscribe(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        self.subscriptions.unsubscribe(&self.connection, &mut out);
        out
    }

    pub fn refresh(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        self.subscriptions.refresh(&self.connection, &mut out);
        out
    }

    /// The transport finished its handshake.
    pub fn on_open(&mut self, now: DateTime<Utc>) -> Vec<Action> {
        let mut out = Vec::new();
        self.connection.on_open(now, &mut out);
        self.server_error = None;
        self.subscriptions.replay(&mut out);
        out
    }

    /// The transport failed to connect.
    pub fn on_connect_error(&mut self, message: impl Into<String>) -> Vec<Action> {
        let mut out = Vec::new();
        self.connection.on_error(message.into(), &mut out);
        out
    }

    /// The armed reconnect timer fired.
    pub fn on_timer(&mut self) -> Vec<Action> {
        let mut out = Vec::new();
        self.connection.on_timer(&mut out);
        out
    }

    pub fn on_event(&mut self, event: TransportEvent, now: DateTime<Utc>) -> Vec<Action> {
        let mut out = Vec::new();
        match event {
            TransportEvent::Closed(reason) => self.connection.on_close(reason, &mut out),
            TransportEvent::Message(message) => self.on_message(message, now, &mut out),
        }
        out
    }

    fn on_message(&mut self, message: ServerEvent, now: DateTime<Utc>, out: &mut Vec<Action>) {
        match message {
            ServerEvent::SubscriptionConfirmed(echo) => {
                let applied = self
                    .subscriptions
                    .on_confirmed(echo.as_ref(), &mut self.connection, out);
                if applied {
                    self.server_error = None;
                }
            }
            ServerEvent::UnsubscriptionConfirmed => {
                self.subscriptions
                    .on_unsubscribe_confirmed(&mut self.connection, out);
            }
            ServerEvent::MetricsUpdate(payload) => {
                self.sink
                    .accept(payload, now, self.connection.stats_mut(), out);
            }
            ServerEvent::Error(error) => {
                self.server_error = Some(error.clone());
                self.subscriptions
                    .on_server_error(error, &mut self.connection, out);
            }
            ServerEvent::Unknown(name) => {
                tracing::debug!(event = %name, "Ignoring unknown server event");
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            state: self.connection.state(),
            descriptor: self.subscriptions.current().cloned(),
            rejected: self.subscriptions.is_rejected(),
            latest_update: self.sink.latest().cloned(),
            connection_error: self.connection.error().cloned(),
            server_error: self.server_error.clone(),
            stats: self.connection.stats().clone(),
            reconnect_pending: self.connection.reconnect_timer().is_some(),
        }
    }
}
