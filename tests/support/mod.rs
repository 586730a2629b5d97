#![allow(dead_code)]

use std::time::Duration;

use pulsewire::client::{ClientEvent, ClientSnapshot, MetricsClient};
use pulsewire::testkit;
use pulsewire::testkit::transport::{channel_transport, ChannelTransportHandle};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Generous bound; with paused time it only matters when a test is stuck.
const WAIT: Duration = Duration::from_secs(300);

/// Spawn a client over a fresh channel transport with production backoff.
pub fn spawn_client() -> (MetricsClient, JoinHandle<()>, ChannelTransportHandle) {
    let (transport, handle) = channel_transport();
    let (client, task) = MetricsClient::spawn(transport, testkit::fixtures::reconnect_config());
    (client, task, handle)
}

/// Let the client task drain everything queued so far.
///
/// Paused time only auto-advances once every task is idle, and the shortest
/// reconnect delay is far longer than this.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Wait until a published snapshot satisfies `pred`.
pub async fn wait_until<F>(client: &MetricsClient, pred: F) -> ClientSnapshot
where
    F: FnMut(&ClientSnapshot) -> bool,
{
    let mut rx = client.watch();
    let snapshot = tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for snapshot")
        .expect("client task ended");
    snapshot.clone()
}

/// Receive events until one satisfies `pred`.
pub async fn next_matching<F>(
    events: &mut broadcast::Receiver<ClientEvent>,
    mut pred: F,
) -> ClientEvent
where
    F: FnMut(&ClientEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.expect("event stream closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

pub fn config_file(contents: &str) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}
