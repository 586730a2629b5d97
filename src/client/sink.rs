//! Inbound update delivery.

use chrono::{DateTime, Utc};
use tracing::trace;

use super::session::{Action, ClientEvent};
use crate::domain::{ConnectionStats, InboundUpdate};
use crate::protocol::MetricsUpdatePayload;

/// Keeps only the most recently received update (last write wins).
#[derive(Debug, Default)]
pub struct UpdateSink {
    latest: Option<InboundUpdate>,
}

impl UpdateSink {
    pub const fn latest(&self) -> Option<&InboundUpdate> {
        self.latest.as_ref()
    }

    pub fn accept(
        &mut self,
        payload: MetricsUpdatePayload,
        now: DateTime<Utc>,
        stats: &mut ConnectionStats,
        out: &mut Vec<Action>,
    ) {
        let update = payload.into_update(now);
        trace!(
            owner = %update.owner_id,
            metrics = update.values.len(),
            "Metrics update received"
        );

        stats.last_update_at = Some(now);
        self.latest = Some(update.clone());
        out.push(Action::Emit(ClientEvent::Update(update)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(roas: f64) -> MetricsUpdatePayload {
        MetricsUpdatePayload {
            timestamp: Utc::now(),
            metrics: [("roas".to_string(), json!(roas))].into(),
            user_id: "u1".into(),
            campaign_ids: None,
        }
    }

    #[test]
    fn latest_update_wins() {
        let mut sink = UpdateSink::default();
        let mut stats = ConnectionStats::default();
        let mut out = Vec::new();

        sink.accept(payload(1.0), Utc::now(), &mut stats, &mut out);
        sink.accept(payload(2.0), Utc::now(), &mut stats, &mut out);

        assert_eq!(sink.latest().unwrap().value_f64("roas"), Some(2.0));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn records_last_update_time() {
        let mut sink = UpdateSink::default();
        let mut stats = ConnectionStats::default();
        let now = Utc::now();

        sink.accept(payload(1.0), now, &mut stats, &mut Vec::new());

        assert_eq!(stats.last_update_at, Some(now));
    }
}
