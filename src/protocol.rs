//! Push service wire messages.
//!
//! Every frame is a JSON text frame carrying an envelope:
//!
//! ```json
//! {"event": "subscribe-metrics", "data": {"userId": "u1", "metrics": ["roas"], "interval": 30}}
//! {"event": "metrics-update", "data": {"timestamp": "2025-01-01T00:00:00Z", "userId": "u1", "metrics": {"roas": 2.4}}}
//! ```
//!
//! Commands without a payload omit `data`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    InboundUpdate, MetricValues, ServerError, ServerErrorCode, SubscriptionDescriptor,
};

/// Commands the client sends to the push service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientCommand {
    SubscribeMetrics(SubscriptionDescriptor),
    UnsubscribeMetrics,
    /// Ask for an immediate update; only meaningful while subscribed.
    GetCurrentMetrics,
}

impl ClientCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SubscribeMetrics(_) => "subscribe-metrics",
            Self::UnsubscribeMetrics => "unsubscribe-metrics",
            Self::GetCurrentMetrics => "get-current-metrics",
        }
    }

    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Events the push service sends to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// The subscription was accepted. Carries the echoed descriptor when the
    /// server sent one that could be decoded.
    SubscriptionConfirmed(Option<SubscriptionDescriptor>),
    UnsubscriptionConfirmed,
    MetricsUpdate(MetricsUpdatePayload),
    Error(ServerError),
    /// An event name this client does not handle.
    Unknown(String),
}

/// Payload of a `metrics-update` event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricsUpdatePayload {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metrics: MetricValues,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "campaignIds", default)]
    pub campaign_ids: Option<BTreeSet<String>>,
}

impl MetricsUpdatePayload {
    /// Stamp with the local receipt time.
    #[must_use]
    pub fn into_update(self, received_at: DateTime<Utc>) -> InboundUpdate {
        InboundUpdate {
            received_at,
            producer_timestamp: self.timestamp,
            owner_id: self.user_id,
            target_ids: self.campaign_ids,
            values: self.metrics,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ServerEvent {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not an envelope, or if a
    /// `metrics-update` payload is malformed. Unrecognized event names decode
    /// to [`ServerEvent::Unknown`].
    pub fn decode(text: &str) -> serde_json::Result<Self> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let event = match envelope.event.as_str() {
            "subscription-confirmed" => Self::SubscriptionConfirmed(decode_echo(envelope.data)),
            "unsubscription-confirmed" => Self::UnsubscriptionConfirmed,
            "metrics-update" => Self::MetricsUpdate(serde_json::from_value(envelope.data)?),
            "error" => Self::Error(decode_error(envelope.data)),
            _ => Self::Unknown(envelope.event),
        };
        Ok(event)
    }
}

/// Echoes arrive either as the bare descriptor or wrapped as
/// `{"subscription": {...}}`.
fn decode_echo(data: serde_json::Value) -> Option<SubscriptionDescriptor> {
    let inner = match data {
        serde_json::Value::Object(mut map) if map.contains_key("subscription") => {
            map.remove("subscription")?
        }
        other => other,
    };
    serde_json::from_value(inner).ok()
}

fn decode_error(data: serde_json::Value) -> ServerError {
    let payload = match data {
        serde_json::Value::String(message) => ErrorPayload {
            code: None,
            message: Some(message),
        },
        other => serde_json::from_value(other).unwrap_or(ErrorPayload {
            code: None,
            message: None,
        }),
    };
    ServerError {
        code: ServerErrorCode::parse(payload.code.as_deref().unwrap_or("UNKNOWN")),
        message: payload.message.unwrap_or_else(|| "unspecified server error".into()),
    }
}
