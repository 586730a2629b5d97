//! Derived subscriptions for the two dashboard call patterns.
//!
//! [`CampaignMetrics`] and [`AccountMetrics`] only compute descriptors; the
//! [`ScopedSubscription`] guard issues them through the client's single
//! subscription tracker, so reconnection and backoff stay in one place.

use std::collections::BTreeSet;

use tracing::debug;

use super::handle::MetricsClient;
use crate::domain::SubscriptionDescriptor;

/// Update interval requested for campaign-scoped subscriptions.
pub const CAMPAIGN_INTERVAL_SECS: u32 = 30;
/// Update interval requested for account-wide subscriptions.
pub const ACCOUNT_INTERVAL_SECS: u32 = 60;

/// Caller intent that derives a subscription descriptor.
pub trait SubscriptionIntent {
    /// The descriptor to subscribe with, or `None` when the intent is
    /// incomplete (no owner yet) and nothing should be subscribed.
    fn descriptor(&self) -> Option<SubscriptionDescriptor>;
}

/// Metrics for a set of campaigns of one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignMetrics {
    owner_id: String,
    campaign_ids: BTreeSet<String>,
    metrics: Vec<String>,
}

impl CampaignMetrics {
    pub fn new<C, M>(owner_id: impl Into<String>, campaign_ids: C, metrics: M) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            owner_id: owner_id.into(),
            campaign_ids: campaign_ids.into_iter().map(Into::into).collect(),
            metrics: metrics.into_iter().map(Into::into).collect(),
        }
    }
}

impl SubscriptionIntent for CampaignMetrics {
    fn descriptor(&self) -> Option<SubscriptionDescriptor> {
        if self.owner_id.is_empty() {
            return None;
        }
        Some(
            SubscriptionDescriptor::new(self.owner_id.clone(), self.metrics.iter().cloned())
                .with_targets(self.campaign_ids.iter().cloned())
                .with_interval(CAMPAIGN_INTERVAL_SECS),
        )
    }
}

/// Metrics across every campaign of one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMetrics {
    owner_id: String,
    metrics: Vec<String>,
}

impl AccountMetrics {
    pub fn new<M>(owner_id: impl Into<String>, metrics: M) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
    {
        Self {
            owner_id: owner_id.into(),
            metrics: metrics.into_iter().map(Into::into).collect(),
        }
    }
}

impl SubscriptionIntent for AccountMetrics {
    fn descriptor(&self) -> Option<SubscriptionDescriptor> {
        if self.owner_id.is_empty() {
            return None;
        }
        Some(
            SubscriptionDescriptor::new(self.owner_id.clone(), self.metrics.iter().cloned())
                .with_interval(ACCOUNT_INTERVAL_SECS),
        )
    }
}

impl SubscriptionIntent for SubscriptionDescriptor {
    fn descriptor(&self) -> Option<SubscriptionDescriptor> {
        Some(self.clone())
    }
}

impl<T: SubscriptionIntent + ?Sized> SubscriptionIntent for Box<T> {
    fn descriptor(&self) -> Option<SubscriptionDescriptor> {
        (**self).descriptor()
    }
}

/// Keeps the client subscribed to whatever the latest intent derives.
///
/// Re-subscribes only when the derived descriptor changes; the newest intent
/// always wins. Dropping the guard unsubscribes.
pub struct ScopedSubscription<I: SubscriptionIntent> {
    client: MetricsClient,
    intent: I,
    issued: Option<SubscriptionDescriptor>,
}

impl<I: SubscriptionIntent> ScopedSubscription<I> {
    pub fn new(client: MetricsClient, intent: I) -> Self {
        let mut scope = Self {
            client,
            intent,
            issued: None,
        };
        scope.sync();
        scope
    }

    /// Replace the intent, re-subscribing if its descriptor differs.
    pub fn update(&mut self, intent: I) {
        self.intent = intent;
        self.sync();
    }

    #[must_use]
    pub const fn intent(&self) -> &I {
        &self.intent
    }

    /// The descriptor most recently issued to the client.
    #[must_use]
    pub const fn descriptor(&self) -> Option<&SubscriptionDescriptor> {
        self.issued.as_ref()
    }

    #[must_use]
    pub const fn client(&self) -> &MetricsClient {
        &self.client
    }

    fn sync(&mut self) {
        let next = self.intent.descriptor();
        if next == self.issued {
            return;
        }

        match &next {
            Some(descriptor) => self.client.subscribe(descriptor.clone()),
            None => {
                debug!("Subscription intent incomplete, withdrawing");
                self.client.unsubscribe();
            }
        }
        self.issued = next;
    }
}

impl<I: SubscriptionIntent> Drop for ScopedSubscription<I> {
    fn drop(&mut self) {
        if self.issued.take().is_some() {
            self.client.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_metrics_use_thirty_second_interval() {
        let descriptor = CampaignMetrics::new("u1", ["c1", "c2"], ["roas"])
            .descriptor()
            .unwrap();

        assert_eq!(descriptor.interval_seconds(), Some(CAMPAIGN_INTERVAL_SECS));
        assert_eq!(descriptor.target_ids().unwrap().len(), 2);
    }

    #[test]
    fn account_metrics_have_no_targets() {
        let descriptor = AccountMetrics::new("u1", ["roas", "spend"])
            .descriptor()
            .unwrap();

        assert_eq!(descriptor.interval_seconds(), Some(ACCOUNT_INTERVAL_SECS));
        assert!(descriptor.target_ids().is_none());
        assert_eq!(descriptor.metric_names(), ["roas", "spend"]);
    }

    #[test]
    fn empty_owner_derives_nothing() {
        assert!(AccountMetrics::new("", ["roas"]).descriptor().is_none());
        assert!(CampaignMetrics::new("", ["c1"], ["roas"])
            .descriptor()
            .is_none());
    }

    #[test]
    fn campaign_order_does_not_change_descriptor() {
        let a = CampaignMetrics::new("u1", ["c1", "c2"], ["roas"]).descriptor();
        let b = CampaignMetrics::new("u1", ["c2", "c1"], ["roas"]).descriptor();
        assert_eq!(a, b);
    }
}
