//! Subscription descriptor sent with `subscribe-metrics`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// What the client wants the push service to stream.
///
/// Immutable once built. Metric names form an ordered set: insertion order is
/// kept and duplicates are dropped. Serializes to the wire field names
/// (`userId`, `campaignIds`, `metrics`, `interval`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDescriptor {
    #[serde(rename = "userId")]
    owner_id: String,
    #[serde(
        rename = "campaignIds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    target_ids: Option<BTreeSet<String>>,
    #[serde(rename = "metrics", default)]
    metric_names: Vec<String>,
    #[serde(rename = "interval", default, skip_serializing_if = "Option::is_none")]
    interval_seconds: Option<u32>,
}

impl SubscriptionDescriptor {
    /// Account-wide descriptor for `owner_id` with no interval preference.
    pub fn new<I, S>(owner_id: impl Into<String>, metric_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for name in metric_names {
            let name = name.into();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Self {
            owner_id: owner_id.into(),
            target_ids: None,
            metric_names: names,
            interval_seconds: None,
        }
    }

    /// Restrict the subscription to the given targets (campaigns).
    #[must_use]
    pub fn with_targets<I, S>(mut self, target_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_ids = Some(target_ids.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, seconds: u32) -> Self {
        self.interval_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    #[must_use]
    pub const fn target_ids(&self) -> Option<&BTreeSet<String>> {
        self.target_ids.as_ref()
    }

    #[must_use]
    pub fn metric_names(&self) -> &[String] {
        &self.metric_names
    }

    #[must_use]
    pub const fn interval_seconds(&self) -> Option<u32> {
        self.interval_seconds
    }

    /// Whether a server echo describes this subscription.
    ///
    /// Metric order is ignored and an interval the echo leaves out matches
    /// anything, so a server that normalizes its echo still confirms.
    #[must_use]
    pub fn matches(&self, echo: &Self) -> bool {
        let ours: BTreeSet<&String> = self.metric_names.iter().collect();
        let theirs: BTreeSet<&String> = echo.metric_names.iter().collect();

        self.owner_id == echo.owner_id
            && self.target_ids == echo.target_ids
            && ours == theirs
            && match (self.interval_seconds, echo.interval_seconds) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}
