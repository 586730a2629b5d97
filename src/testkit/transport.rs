//! Mock [`Transport`] implementations for testing.
//!
//! Two mock transport types for different testing needs:
//!
//! - [`ScriptedTransport`] - Pre-loaded connect results and events.
//!   Best for: simple lifecycle checks where the script is known up front.
//!
//! - [`ChannelTransport`] - Channel-backed transport with external control
//!   handle. Best for: integration tests needing precise, on-demand event
//!   delivery, scripted connect failures, slow handshakes and inspection of
//!   sent commands.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::SubscriptionDescriptor;
use crate::error::{Error, Result};
use crate::protocol::ClientCommand;
use crate::transport::{Transport, TransportEvent};

type SentLog = Arc<Mutex<Vec<ClientCommand>>>;

fn subscribe_payloads(sent: &[ClientCommand]) -> Vec<SubscriptionDescriptor> {
    sent.iter()
        .filter_map(|c| match c {
            ClientCommand::SubscribeMetrics(d) => Some(d.clone()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// A mock transport with scripted connect results and a fixed event queue.
///
/// Each call to `connect()` pops the next result (defaults to `Ok(())` when
/// exhausted). Once the event queue is drained the connection stays quiet.
pub struct ScriptedTransport {
    connect_results: VecDeque<Result<()>>,
    events: VecDeque<TransportEvent>,
    sent: SentLog,
    connect_count: Arc<AtomicU32>,
    open: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            events: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            connect_count: Arc::new(AtomicU32::new(0)),
            open: false,
        }
    }

    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }

    pub fn with_events(mut self, events: Vec<TransportEvent>) -> Self {
        self.events = events.into();
        self
    }

    /// Shared log of every command sent, in order.
    pub fn sent_log(&self) -> SentLog {
        self.sent.clone()
    }

    /// Shared counter of `connect()` calls.
    pub fn connect_counter(&self) -> Arc<AtomicU32> {
        self.connect_count.clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let result = self.connect_results.pop_front().unwrap_or(Ok(()));
        self.open = result.is_ok();
        result
    }

    async fn send(&mut self, command: &ClientCommand) -> Result<()> {
        if !self.open {
            return Err(Error::Connection("not connected".into()));
        }
        self.sent.lock().push(command.clone());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if !self.open {
            return None;
        }
        match self.events.pop_front() {
            Some(event) => {
                if matches!(event, TransportEvent::Closed(_)) {
                    self.open = false;
                }
                Some(event)
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.open = false;
    }

    fn endpoint(&self) -> &str {
        "scripted://metrics"
    }
}

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// A mock transport controlled externally via a [`ChannelTransportHandle`].
///
/// Events pushed into the handle are delivered only while the transport is
/// open, in order. No real network I/O.
pub struct ChannelTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    connect_results: Arc<Mutex<VecDeque<std::result::Result<(), String>>>>,
    connect_delay: Arc<Mutex<Option<Duration>>>,
    sent: SentLog,
    connect_count: Arc<AtomicU32>,
    close_count: Arc<AtomicU32>,
    open: bool,
}

/// Control handle for a [`ChannelTransport`].
#[derive(Clone)]
pub struct ChannelTransportHandle {
    events: mpsc::UnboundedSender<TransportEvent>,
    connect_results: Arc<Mutex<VecDeque<std::result::Result<(), String>>>>,
    connect_delay: Arc<Mutex<Option<Duration>>>,
    sent: SentLog,
    connect_count: Arc<AtomicU32>,
    close_count: Arc<AtomicU32>,
}

impl ChannelTransportHandle {
    /// Queue an event for the client.
    pub fn push(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Simulate a server-initiated close.
    pub fn drop_connection(&self) {
        self.push(super::fixtures::server_disconnect());
    }

    /// Make the next `count` connect attempts fail with `message`.
    pub fn fail_connects(&self, count: usize, message: &str) {
        let mut results = self.connect_results.lock();
        for _ in 0..count {
            results.push_back(Err(message.to_string()));
        }
    }

    /// Make every later handshake take `delay` before it resolves.
    pub fn delay_connects(&self, delay: Duration) {
        *self.connect_delay.lock() = Some(delay);
    }

    /// Every command sent so far, in order.
    pub fn sent(&self) -> Vec<ClientCommand> {
        self.sent.lock().clone()
    }

    /// Payloads of every `subscribe-metrics` sent so far.
    pub fn subscribe_commands(&self) -> Vec<SubscriptionDescriptor> {
        subscribe_payloads(&self.sent.lock())
    }

    /// How many times `connect()` was called.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// How many times an open connection was closed by the client.
    pub fn close_count(&self) -> u32 {
        self.close_count.load(Ordering::SeqCst)
    }
}

/// Create a [`ChannelTransport`] and its control [`ChannelTransportHandle`].
pub fn channel_transport() -> (ChannelTransport, ChannelTransportHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let results = Arc::new(Mutex::new(VecDeque::new()));
    let delay = Arc::new(Mutex::new(None));
    let sent = Arc::new(Mutex::new(Vec::new()));
    let cc = Arc::new(AtomicU32::new(0));
    let closes = Arc::new(AtomicU32::new(0));
    (
        ChannelTransport {
            events: rx,
            connect_results: results.clone(),
            connect_delay: delay.clone(),
            sent: sent.clone(),
            connect_count: cc.clone(),
            close_count: closes.clone(),
            open: false,
        },
        ChannelTransportHandle {
            events: tx,
            connect_results: results,
            connect_delay: delay,
            sent,
            connect_count: cc,
            close_count: closes,
        },
    )
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let delay = *self.connect_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.connect_results.lock().pop_front().unwrap_or(Ok(()));
        self.open = result.is_ok();
        result.map_err(Error::Connection)
    }

    async fn send(&mut self, command: &ClientCommand) -> Result<()> {
        if !self.open {
            return Err(Error::Connection("not connected".into()));
        }
        self.sent.lock().push(command.clone());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if !self.open {
            return None;
        }
        match self.events.recv().await {
            Some(event) => {
                if matches!(event, TransportEvent::Closed(_)) {
                    self.open = false;
                }
                Some(event)
            }
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn endpoint(&self) -> &str {
        "channel://metrics"
    }
}
