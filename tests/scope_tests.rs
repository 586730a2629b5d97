//! Integration tests for derived subscriptions.

mod support;

use pulsewire::client::{
    AccountMetrics, CampaignMetrics, ScopedSubscription, ACCOUNT_INTERVAL_SECS,
    CAMPAIGN_INTERVAL_SECS,
};
use pulsewire::protocol::ClientCommand;
use pulsewire::testkit::fixtures;

use support::{settle, spawn_client, wait_until};

#[tokio::test(start_paused = true)]
async fn campaign_scope_subscribes_with_campaign_interval() {
    let (client, _task, transport) = spawn_client();
    client.start();
    wait_until(&client, |s| s.is_connected()).await;

    let scope = ScopedSubscription::new(
        client.clone(),
        CampaignMetrics::new("u1", ["c1", "c2"], ["roas", "spend"]),
    );
    settle().await;

    let sent = transport.subscribe_commands();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interval_seconds(), Some(CAMPAIGN_INTERVAL_SECS));
    assert_eq!(sent[0].target_ids().map(|t| t.len()), Some(2));
    assert_eq!(scope.descriptor(), Some(&sent[0]));
}

#[tokio::test(start_paused = true)]
async fn account_scope_has_no_targets() {
    let (client, _task, transport) = spawn_client();
    client.start();
    wait_until(&client, |s| s.is_connected()).await;

    let _scope = ScopedSubscription::new(client.clone(), AccountMetrics::new("u1", ["roas"]));
    settle().await;

    let sent = transport.subscribe_commands();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].interval_seconds(), Some(ACCOUNT_INTERVAL_SECS));
    assert!(sent[0].target_ids().is_none());
}

#[tokio::test(start_paused = true)]
async fn unchanged_intent_does_not_resubscribe() {
    let (client, _task, transport) = spawn_client();
    client.start();
    wait_until(&client, |s| s.is_connected()).await;

    let mut scope = ScopedSubscription::new(
        client.clone(),
        CampaignMetrics::new("u1", ["c1", "c2"], ["roas"]),
    );
    scope.update(CampaignMetrics::new("u1", ["c2", "c1"], ["roas"]));
    settle().await;
    assert_eq!(transport.subscribe_commands().len(), 1);

    scope.update(CampaignMetrics::new("u1", ["c1", "c2", "c3"], ["roas"]));
    settle().await;
    let sent = transport.subscribe_commands();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].target_ids().map(|t| t.len()), Some(3));
}

#[tokio::test(start_paused = true)]
async fn late_confirmation_of_replaced_scope_is_ignored() {
    let (client, _task, transport) = spawn_client();
    client.start();
    wait_until(&client, |s| s.is_connected()).await;

    let mut scope = ScopedSubscription::new(
        client.clone(),
        CampaignMetrics::new("u1", ["c1"], ["roas"]),
    );
    settle().await;
    let first = transport.subscribe_commands()[0].clone();

    scope.update(CampaignMetrics::new("u1", ["c2"], ["roas"]));
    settle().await;
    let second = transport.subscribe_commands()[1].clone();
    assert_ne!(first, second);

    transport.push(fixtures::confirmed_for(&first));
    settle().await;
    let snapshot = client.snapshot();
    assert!(!snapshot.is_subscribed());
    assert_eq!(snapshot.descriptor.as_ref(), Some(&second));
    assert_eq!(scope.descriptor(), Some(&second));

    transport.push(fixtures::confirmed_for(&second));
    let snapshot = wait_until(&client, |s| s.is_subscribed()).await;
    assert_eq!(snapshot.descriptor, Some(second));
    assert_eq!(transport.subscribe_commands().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_owner_withdraws_subscription() {
    let (client, _task, transport) = spawn_client();
    client.start();
    wait_until(&client, |s| s.is_connected()).await;

    let mut scope = ScopedSubscription::new(client.clone(), AccountMetrics::new("u1", ["roas"]));
    settle().await;
    transport.push(fixtures::confirmed());
    wait_until(&client, |s| s.is_subscribed()).await;

    scope.update(AccountMetrics::new("", ["roas"]));
    let snapshot = wait_until(&client, |s| s.descriptor.is_none()).await;
    assert!(scope.descriptor().is_none());
    assert!(snapshot.is_connected());
    assert_eq!(
        transport.sent().last(),
        Some(&ClientCommand::UnsubscribeMetrics)
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_scope_unsubscribes() {
    let (client, _task, transport) = spawn_client();
    client.start();
    wait_until(&client, |s| s.is_connected()).await;

    let scope = ScopedSubscription::new(client.clone(), AccountMetrics::new("u1", ["roas"]));
    settle().await;
    transport.push(fixtures::confirmed());
    wait_until(&client, |s| s.is_subscribed()).await;

    drop(scope);
    wait_until(&client, |s| s.descriptor.is_none()).await;
    assert_eq!(
        transport.sent().last(),
        Some(&ClientCommand::UnsubscribeMetrics)
    );
}

#[tokio::test(start_paused = true)]
async fn scope_created_before_connect_is_replayed() {
    let (client, _task, transport) = spawn_client();

    let _scope = ScopedSubscription::new(client.clone(), AccountMetrics::new("u1", ["roas"]));
    settle().await;
    assert!(transport.subscribe_commands().is_empty());

    client.start();
    wait_until(&client, |s| s.is_connected()).await;
    settle().await;
    assert_eq!(transport.subscribe_commands().len(), 1);
}
