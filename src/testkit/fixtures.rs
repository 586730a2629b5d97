//! Builders for domain values and server events used across tests.

use chrono::Utc;

use crate::config::ReconnectionConfig;
use crate::domain::{ServerError, ServerErrorCode, SubscriptionDescriptor};
use crate::protocol::{MetricsUpdatePayload, ServerEvent};
use crate::transport::{DisconnectReason, TransportEvent};

/// `{owner, metrics: ["roas"], interval: 30}`.
pub fn descriptor(owner: &str) -> SubscriptionDescriptor {
    SubscriptionDescriptor::new(owner, ["roas"]).with_interval(30)
}

/// Production backoff (1 s doubling to 30 s, five attempts).
pub fn reconnect_config() -> ReconnectionConfig {
    ReconnectionConfig::default()
}

pub fn confirmed() -> TransportEvent {
    TransportEvent::Message(ServerEvent::SubscriptionConfirmed(None))
}

pub fn confirmed_for(descriptor: &SubscriptionDescriptor) -> TransportEvent {
    TransportEvent::Message(ServerEvent::SubscriptionConfirmed(Some(
        descriptor.clone(),
    )))
}

pub fn unsubscribed() -> TransportEvent {
    TransportEvent::Message(ServerEvent::UnsubscriptionConfirmed)
}

/// A `metrics-update` carrying a single metric value.
pub fn update(owner: &str, metric: &str, value: f64) -> TransportEvent {
    TransportEvent::Message(ServerEvent::MetricsUpdate(MetricsUpdatePayload {
        timestamp: Utc::now(),
        metrics: [(metric.to_string(), serde_json::json!(value))].into(),
        user_id: owner.to_string(),
        campaign_ids: None,
    }))
}

pub fn server_error(code: &str, message: &str) -> TransportEvent {
    TransportEvent::Message(ServerEvent::Error(ServerError {
        code: ServerErrorCode::parse(code),
        message: message.to_string(),
    }))
}

pub fn server_disconnect() -> TransportEvent {
    TransportEvent::Closed(DisconnectReason::ServerInitiated("io server disconnect".into()))
}
