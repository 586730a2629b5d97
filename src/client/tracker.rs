//! The single active subscription and its transmission.

use tracing::{debug, info, trace, warn};

use super::connection::ConnectionManager;
use super::session::{Action, ClientEvent};
use crate::domain::{ServerError, SubscriptionDescriptor};
use crate::protocol::ClientCommand;

/// Holds the caller's current subscription intent.
///
/// The client is the source of truth: the descriptor survives disconnects and
/// is replayed on every successful connect. A rejected descriptor is kept
/// (with `rejected` set) so the caller's intent is never silently dropped.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    current: Option<SubscriptionDescriptor>,
    rejected: bool,
}

impl SubscriptionTracker {
    pub const fn current(&self) -> Option<&SubscriptionDescriptor> {
        self.current.as_ref()
    }

    pub const fn is_rejected(&self) -> bool {
        self.rejected
    }

    /// Replace the current descriptor and send it if the link is up.
    pub fn subscribe(
        &mut self,
        descriptor: SubscriptionDescriptor,
        connection: &mut ConnectionManager,
        out: &mut Vec<Action>,
    ) {
        let unchanged = self.current.as_ref() == Some(&descriptor);
        self.rejected = false;

        if connection.state().is_connected() {
            if !unchanged {
                connection.clear_subscribed();
            }
            info!(
                owner = descriptor.owner_id(),
                metrics = ?descriptor.metric_names(),
                "Subscribing to metrics"
            );
            out.push(Action::Send(ClientCommand::SubscribeMetrics(
                descriptor.clone(),
            )));
        } else {
            debug!(
                owner = descriptor.owner_id(),
                state = %connection.state(),
                "Subscription retained until connected"
            );
        }

        self.current = Some(descriptor);
    }

    /// Withdraw the subscription and forget the descriptor.
    pub fn unsubscribe(&mut self, connection: &ConnectionManager, out: &mut Vec<Action>) {
        if connection.state().is_subscribed() {
            info!("Unsubscribing from metrics");
            out.push(Action::Send(ClientCommand::UnsubscribeMetrics));
        }
        self.current = None;
        self.rejected = false;
    }

    /// Re-issue the held descriptor after a (re)connect.
    pub fn replay(&mut self, out: &mut Vec<Action>) {
        if let Some(descriptor) = &self.current {
            info!(owner = descriptor.owner_id(), "Resubscribing after connect");
            self.rejected = false;
            out.push(Action::Send(ClientCommand::SubscribeMetrics(
                descriptor.clone(),
            )));
        }
    }

    /// Request an immediate update; ignored unless subscribed.
    pub fn refresh(&self, connection: &ConnectionManager, out: &mut Vec<Action>) {
        if connection.state().is_subscribed() {
            out.push(Action::Send(ClientCommand::GetCurrentMetrics));
        } else {
            trace!(state = %connection.state(), "Refresh ignored, not subscribed");
        }
    }

    /// Apply a confirmation. Returns whether it matched the held descriptor.
    pub fn on_confirmed(
        &mut self,
        echo: Option<&SubscriptionDescriptor>,
        connection: &mut ConnectionManager,
        out: &mut Vec<Action>,
    ) -> bool {
        let Some(current) = &self.current else {
            debug!("Confirmation ignored, no subscription held");
            return false;
        };
        if let Some(echo) = echo {
            if !current.matches(echo) {
                debug!(
                    echo_owner = echo.owner_id(),
                    "Confirmation for superseded subscription ignored"
                );
                return false;
            }
        }

        info!(owner = current.owner_id(), "Subscription confirmed");
        self.rejected = false;
        connection.mark_subscribed();
        out.push(Action::Emit(ClientEvent::SubscriptionConfirmed(
            current.clone(),
        )));
        true
    }

    pub fn on_unsubscribe_confirmed(
        &mut self,
        connection: &mut ConnectionManager,
        out: &mut Vec<Action>,
    ) {
        info!("Unsubscription confirmed");
        connection.clear_subscribed();
        out.push(Action::Emit(ClientEvent::Unsubscribed));
    }

    pub fn on_server_error(
        &mut self,
        error: ServerError,
        connection: &mut ConnectionManager,
        out: &mut Vec<Action>,
    ) {
        warn!(code = %error.code, message = %error.message, "Server error");

        if !error.code.is_subscription_validity() {
            out.push(Action::Emit(ClientEvent::ServerError(error)));
            return;
        }

        connection.clear_subscribed();
        match &self.current {
            Some(descriptor) => {
                self.rejected = true;
                out.push(Action::Emit(ClientEvent::SubscriptionRejected {
                    descriptor: descriptor.clone(),
                    error,
                }));
            }
            None => out.push(Action::Emit(ClientEvent::ServerError(error))),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::config::ReconnectionConfig;

    fn connected() -> ConnectionManager {
        let mut connection = ConnectionManager::new(ReconnectionConfig::default());
        let mut out = Vec::new();
        connection.start(&mut out);
        connection.on_open(Utc::now(), &mut out);
        connection
    }

    #[test]
    fn confirmation_reports_whether_it_applied() {
        let mut connection = connected();
        let mut tracker = SubscriptionTracker::default();
        let mut out = Vec::new();

        assert!(!tracker.on_confirmed(None, &mut connection, &mut out));

        let current = SubscriptionDescriptor::new("u1", ["roas", "spend"]);
        tracker.subscribe(current.clone(), &mut connection, &mut out);
        assert_eq!(
            out,
            vec![Action::Send(ClientCommand::SubscribeMetrics(current.clone()))]
        );

        let stale = SubscriptionDescriptor::new("u0", ["roas"]);
        assert!(!tracker.on_confirmed(Some(&stale), &mut connection, &mut out));
        assert!(!connection.state().is_subscribed());

        let echo = SubscriptionDescriptor::new("u1", ["spend", "roas"]);
        assert!(tracker.on_confirmed(Some(&echo), &mut connection, &mut out));
        assert!(connection.state().is_subscribed());
    }
}
