//! `pulsewire watch`: stream metrics until Ctrl-C.

use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use super::{load_config_or_default, output, WatchArgs};
use crate::client::{
    AccountMetrics, CampaignMetrics, ClientEvent, MetricsClient, ScopedSubscription,
    SubscriptionIntent,
};
use crate::domain::SubscriptionDescriptor;
use crate::error::{Error, Result};
use crate::transport::WebSocketTransport;

/// Pick the subscription scope for the given flags.
///
/// An explicit `--interval` sends the descriptor as-is; otherwise campaigns
/// select the campaign scope and their absence the account scope.
#[must_use]
pub fn intent_for(args: &WatchArgs) -> Box<dyn SubscriptionIntent + Send> {
    if let Some(interval) = args.interval {
        let descriptor = SubscriptionDescriptor::new(args.owner.clone(), args.metrics.clone())
            .with_interval(interval);
        let descriptor = if args.campaigns.is_empty() {
            descriptor
        } else {
            descriptor.with_targets(args.campaigns.clone())
        };
        return Box::new(descriptor);
    }

    if args.campaigns.is_empty() {
        Box::new(AccountMetrics::new(args.owner.clone(), args.metrics.clone()))
    } else {
        Box::new(CampaignMetrics::new(
            args.owner.clone(),
            args.campaigns.clone(),
            args.metrics.clone(),
        ))
    }
}

pub async fn execute(args: WatchArgs) -> Result<()> {
    let mut config = load_config_or_default(&args.config)?;
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    config.init_logging();

    let transport = WebSocketTransport::from_config(&config.stream)?;
    output::section("Watching metrics");
    output::field("Endpoint", transport.url());
    output::field("Owner", &args.owner);
    output::field("Metrics", args.metrics.join(", "));
    if !args.campaigns.is_empty() {
        output::field("Campaigns", args.campaigns.join(", "));
    }

    let (client, task) = MetricsClient::spawn(transport, config.reconnect.clone());
    let mut events = client.events();
    client.start();
    let scope = ScopedSubscription::new(client.clone(), intent_for(&args));

    let outcome = loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break Ok(());
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(err) = render(&event) {
                        break Err(err);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    output::warning(&format!("Output fell behind, skipped {skipped} events"));
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    drop(scope);
    client.shutdown();
    if let Err(e) = task.await {
        output::warning(&format!("Client task ended abnormally: {e}"));
    }
    output::note("Stopped");

    outcome
}

/// Print one client event. Returns an error once reconnection is exhausted.
fn render(event: &ClientEvent) -> Option<Error> {
    let now = chrono::Utc::now().format("%H:%M:%S").to_string();
    match event {
        ClientEvent::Update(update) => output::update(update),
        ClientEvent::Connected => output::status(&now, "connected", ""),
        ClientEvent::Disconnected { reason } => {
            output::status(&now, "disconnected", &reason.to_string());
        }
        ClientEvent::ReconnectScheduled { attempt, delay } => output::status(
            &now,
            "reconnecting",
            &format!("attempt {attempt} in {}ms", delay.as_millis()),
        ),
        ClientEvent::SubscriptionConfirmed(descriptor) => output::status(
            &now,
            "subscribed",
            &format!("{} metrics", descriptor.metric_names().len()),
        ),
        ClientEvent::SubscriptionRejected { error, .. } => {
            output::error(&format!("Subscription rejected: {error}"));
        }
        ClientEvent::Unsubscribed => output::status(&now, "unsubscribed", ""),
        ClientEvent::ServerError(error) => output::warning(&error.to_string()),
        ClientEvent::ConnectionError(error) if error.is_terminal() => {
            output::error(&error.to_string());
            return Some(Error::Connection(error.to_string()));
        }
        ClientEvent::ConnectionError(error) => output::warning(&error.to_string()),
    }
    None
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::client::{ACCOUNT_INTERVAL_SECS, CAMPAIGN_INTERVAL_SECS};
    use crate::domain::ConnectionError;

    fn args(campaigns: &[&str], interval: Option<u32>) -> WatchArgs {
        WatchArgs {
            config: PathBuf::from("config.toml"),
            owner: "u1".into(),
            campaigns: campaigns.iter().map(|c| c.to_string()).collect(),
            metrics: vec!["roas".into()],
            interval,
            log_level: None,
        }
    }

    #[test]
    fn campaigns_select_campaign_scope() {
        let descriptor = intent_for(&args(&["c1"], None)).descriptor().unwrap();
        assert_eq!(descriptor.interval_seconds(), Some(CAMPAIGN_INTERVAL_SECS));
        assert!(descriptor.target_ids().is_some());
    }

    #[test]
    fn no_campaigns_select_account_scope() {
        let descriptor = intent_for(&args(&[], None)).descriptor().unwrap();
        assert_eq!(descriptor.interval_seconds(), Some(ACCOUNT_INTERVAL_SECS));
        assert!(descriptor.target_ids().is_none());
    }

    #[test]
    fn explicit_interval_wins() {
        let descriptor = intent_for(&args(&["c1"], Some(5))).descriptor().unwrap();
        assert_eq!(descriptor.interval_seconds(), Some(5));
        assert_eq!(descriptor.target_ids().unwrap().len(), 1);
    }

    #[test]
    fn exhaustion_ends_the_watch() {
        let event = ClientEvent::ConnectionError(ConnectionError::Exhausted { attempts: 5 });
        assert!(render(&event).is_some());

        let event = ClientEvent::ConnectionError(ConnectionError::Transport("refused".into()));
        assert!(render(&event).is_none());
    }
}
