//! Streaming metrics client.
//!
//! - [`Session`] - synchronous state machine (connection manager,
//!   subscription tracker, update sink) that turns requests and transport
//!   events into [`Action`]s
//! - [`MetricsClient`] - handle to the tokio task that executes those actions
//!   against a [`Transport`](crate::transport::Transport)
//! - [`ScopedSubscription`] - keeps a derived subscription in sync with caller
//!   intent and withdraws it on drop

mod connection;
mod handle;
mod scope;
mod session;
mod sink;
mod tracker;

pub use handle::MetricsClient;
pub use scope::{
    AccountMetrics, CampaignMetrics, ScopedSubscription, SubscriptionIntent,
    ACCOUNT_INTERVAL_SECS, CAMPAIGN_INTERVAL_SECS,
};
pub use session::{Action, ClientEvent, ClientSnapshot, Session};
