//! Connection lifecycle and reconnection scheduling.
//!
//! [`ConnectionManager`] owns the [`ConnectionState`], the attempt counter and
//! the single reconnect timer. It never touches the network itself: every
//! transition pushes [`Action`]s that the client task executes.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::session::{Action, ClientEvent};
use crate::config::ReconnectionConfig;
use crate::domain::{ConnectionError, ConnectionState, ConnectionStats};
use crate::transport::DisconnectReason;

pub struct ConnectionManager {
    config: ReconnectionConfig,
    state: ConnectionState,
    stats: ConnectionStats,
    /// Delay of the armed reconnect timer, if any. At most one is armed.
    reconnect_timer: Option<Duration>,
    error: Option<ConnectionError>,
    /// Set by `stop()`; suppresses reconnection until the next `start()`.
    halted: bool,
}

impl ConnectionManager {
    pub fn new(config: ReconnectionConfig) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            stats: ConnectionStats::default(),
            reconnect_timer: None,
            error: None,
            halted: false,
        }
    }

    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    pub const fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub const fn error(&self) -> Option<&ConnectionError> {
        self.error.as_ref()
    }

    pub const fn reconnect_timer(&self) -> Option<Duration> {
        self.reconnect_timer
    }

    pub(super) fn stats_mut(&mut self) -> &mut ConnectionStats {
        &mut self.stats
    }

    /// Open the transport unless a socket is live or a handshake is in flight.
    ///
    /// An explicit start cancels a pending reconnect and re-enables
    /// reconnection after `stop()`.
    pub fn start(&mut self, out: &mut Vec<Action>) {
        if self.state != ConnectionState::Disconnected {
            debug!(state = %self.state, "Start ignored, connection already active");
            return;
        }

        self.halted = false;
        self.cancel_timer(out);
        self.state = ConnectionState::Connecting;
        out.push(Action::Connect);
    }

    /// Cancel the timer, close the socket and stay down. Idempotent.
    pub fn stop(&mut self, out: &mut Vec<Action>) {
        self.halted = true;
        self.cancel_timer(out);

        if self.state != ConnectionState::Disconnected {
            info!("Stopping metrics connection");
            out.push(Action::Close);
            self.state = ConnectionState::Disconnected;
            out.push(Action::Emit(ClientEvent::Disconnected {
                reason: DisconnectReason::ClientInitiated,
            }));
        }
    }

    /// Transport handshake succeeded.
    pub fn on_open(&mut self, now: DateTime<Utc>, out: &mut Vec<Action>) {
        info!(
            previous_attempts = self.stats.reconnect_attempts,
            "Connected to push service"
        );
        self.state = ConnectionState::Connected;
        self.stats.reconnect_attempts = 0;
        self.stats.last_connected_at = Some(now);
        self.error = None;
        self.cancel_timer(out);
        out.push(Action::Emit(ClientEvent::Connected));
    }

    /// The live connection ended.
    pub fn on_close(&mut self, reason: DisconnectReason, out: &mut Vec<Action>) {
        if self.state == ConnectionState::Disconnected {
            debug!(%reason, "Close ignored, already disconnected");
            return;
        }

        warn!(%reason, "Connection lost");
        self.state = ConnectionState::Disconnected;
        let reconnect = reason.should_reconnect();
        out.push(Action::Emit(ClientEvent::Disconnected { reason }));

        if reconnect {
            self.schedule_reconnect(out);
        }
    }

    /// A connect attempt or the socket failed.
    pub fn on_error(&mut self, message: String, out: &mut Vec<Action>) {
        warn!(error = %message, "Connection error");
        if !self.state.is_connected() {
            self.state = ConnectionState::Disconnected;
        }
        let error = ConnectionError::Transport(message);
        self.error = Some(error.clone());
        out.push(Action::Emit(ClientEvent::ConnectionError(error)));
        self.schedule_reconnect(out);
    }

    /// The armed reconnect timer fired.
    pub fn on_timer(&mut self, out: &mut Vec<Action>) {
        self.reconnect_timer = None;
        if self.halted {
            debug!("Reconnect timer fired after stop, ignoring");
            return;
        }
        self.start(out);
    }

    /// Arm the reconnect timer with exponential backoff, or give up.
    pub fn schedule_reconnect(&mut self, out: &mut Vec<Action>) {
        if self.halted {
            return;
        }

        let attempts = self.stats.reconnect_attempts;
        if attempts >= self.config.max_attempts {
            self.cancel_timer(out);
            error!(attempts, "Reconnection attempts exhausted, giving up");
            let error = ConnectionError::Exhausted { attempts };
            self.error = Some(error.clone());
            out.push(Action::Emit(ClientEvent::ConnectionError(error)));
            return;
        }

        let delay = self.config.delay_for(attempts);
        self.stats.reconnect_attempts = attempts + 1;
        self.reconnect_timer = Some(delay);
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = attempts + 1,
            "Reconnecting after delay"
        );
        out.push(Action::ArmTimer(delay));
        out.push(Action::Emit(ClientEvent::ReconnectScheduled {
            attempt: attempts + 1,
            delay,
        }));
    }

    pub(super) fn mark_subscribed(&mut self) {
        if self.state.is_connected() {
            self.state = ConnectionState::Subscribed;
        }
    }

    pub(super) fn clear_subscribed(&mut self) {
        if self.state == ConnectionState::Subscribed {
            self.state = ConnectionState::Connected;
        }
    }

    fn cancel_timer(&mut self, out: &mut Vec<Action>) {
        if self.reconnect_timer.take().is_some() {
            out.push(Action::CancelTimer);
        }
    }
}
