//! Inbound metric updates.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metric values keyed by metric name.
pub type MetricValues = BTreeMap<String, serde_json::Value>;

/// A `metrics-update` stamped with the local receipt time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundUpdate {
    pub received_at: DateTime<Utc>,
    pub producer_timestamp: DateTime<Utc>,
    pub owner_id: String,
    pub target_ids: Option<BTreeSet<String>>,
    pub values: MetricValues,
}

impl InboundUpdate {
    /// Numeric value of a metric, when present and numeric.
    #[must_use]
    pub fn value_f64(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).and_then(serde_json::Value::as_f64)
    }

    /// Delay between the producer stamping the update and local receipt.
    #[must_use]
    pub fn latency(&self) -> chrono::Duration {
        self.received_at - self.producer_timestamp
    }
}
