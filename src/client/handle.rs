//! The client task and its caller-facing handle.
//!
//! One tokio task per client owns the transport, the [`Session`] and the
//! reconnect timer, so every transition happens sequentially on that task.
//! [`MetricsClient`] talks to it through an unbounded request channel and
//! never blocks; results come back through a `watch` snapshot and a
//! `broadcast` event stream.

use std::collections::VecDeque;
use std::pin::Pin;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Sleep};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use super::session::{Action, ClientEvent, ClientSnapshot, Session};
use crate::config::ReconnectionConfig;
use crate::domain::{ConnectionError, ConnectionStats, InboundUpdate, SubscriptionDescriptor};
use crate::transport::{DisconnectReason, Transport, TransportEvent};

/// Buffered notifications per observer before it starts lagging.
const EVENT_CAPACITY: usize = 256;

#[derive(Debug)]
enum Request {
    Start,
    Stop,
    Subscribe(SubscriptionDescriptor),
    Unsubscribe,
    Refresh,
    Shutdown,
}

/// Cloneable handle to a running metrics client.
///
/// All operations return immediately. When the last handle is dropped (or
/// [`shutdown`](Self::shutdown) is called) the task unsubscribes, stops the
/// connection and exits.
#[derive(Clone)]
pub struct MetricsClient {
    id: Uuid,
    requests: mpsc::UnboundedSender<Request>,
    snapshot: watch::Receiver<ClientSnapshot>,
    events: broadcast::Sender<ClientEvent>,
}

impl MetricsClient {
    /// Spawn the client task on the current tokio runtime.
    ///
    /// The client starts `Disconnected`; call [`start`](Self::start) to
    /// connect.
    pub fn spawn<T>(transport: T, config: ReconnectionConfig) -> (Self, JoinHandle<()>)
    where
        T: Transport + 'static,
    {
        let id = Uuid::new_v4();
        let session = Session::new(config);
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let task = ClientTask {
            transport,
            session,
            requests: request_rx,
            snapshot: snapshot_tx,
            events: events.clone(),
            timer: None,
            exiting: false,
        };
        let handle = tokio::spawn(task.run().instrument(info_span!("metrics_client", %id)));

        let client = Self {
            id,
            requests: request_tx,
            snapshot: snapshot_rx,
            events,
        };
        (client, handle)
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    pub fn start(&self) {
        self.send(Request::Start);
    }

    pub fn stop(&self) {
        self.send(Request::Stop);
    }

    /// Make `descriptor` the active subscription, replacing any other.
    pub fn subscribe(&self, descriptor: SubscriptionDescriptor) {
        self.send(Request::Subscribe(descriptor));
    }

    pub fn unsubscribe(&self) {
        self.send(Request::Unsubscribe);
    }

    /// Ask for an immediate update. Ignored unless subscribed.
    pub fn refresh(&self) {
        self.send(Request::Refresh);
    }

    /// Unsubscribe, stop and end the task. Await the `JoinHandle` from
    /// [`spawn`](Self::spawn) to wait for it.
    pub fn shutdown(&self) {
        self.send(Request::Shutdown);
    }

    #[must_use]
    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.snapshot.borrow().is_connected()
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.snapshot.borrow().is_subscribed()
    }

    #[must_use]
    pub fn latest_update(&self) -> Option<InboundUpdate> {
        self.snapshot.borrow().latest_update.clone()
    }

    #[must_use]
    pub fn connection_error(&self) -> Option<ConnectionError> {
        self.snapshot.borrow().connection_error.clone()
    }

    #[must_use]
    pub fn connection_stats(&self) -> ConnectionStats {
        self.snapshot.borrow().stats.clone()
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ClientSnapshot> {
        self.snapshot.clone()
    }

    /// Subscribe to lifecycle, confirmation and update notifications.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn send(&self, request: Request) {
        if let Err(err) = self.requests.send(request) {
            debug!(request = ?err.0, "Metrics client task has stopped, request dropped");
        }
    }
}

struct ClientTask<T> {
    transport: T,
    session: Session,
    requests: mpsc::UnboundedReceiver<Request>,
    snapshot: watch::Sender<ClientSnapshot>,
    events: broadcast::Sender<ClientEvent>,
    timer: Option<Pin<Box<Sleep>>>,
    /// Set when a shutdown arrives mid-handshake.
    exiting: bool,
}

impl<T: Transport> ClientTask<T> {
    async fn run(mut self) {
        debug!(endpoint = self.transport.endpoint(), "Metrics client task started");

        loop {
            let actions = tokio::select! {
                request = self.requests.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.handle(request),
                },
                event = self.transport.next_event(), if self.session.is_connected() => {
                    let event = event
                        .unwrap_or(TransportEvent::Closed(DisconnectReason::TransportClosed));
                    self.session.on_event(event, Utc::now())
                }
                () = fire(&mut self.timer), if self.timer.is_some() => {
                    self.timer = None;
                    self.session.on_timer()
                }
            };
            self.execute(actions).await;
            self.publish();
            if self.exiting {
                break;
            }
        }

        let mut actions = self.session.unsubscribe();
        actions.extend(self.session.stop());
        self.execute(actions).await;
        self.publish();
        debug!("Metrics client task stopped");
    }

    fn handle(&mut self, request: Request) -> Vec<Action> {
        match request {
            Request::Start => self.session.start(),
            Request::Stop => self.session.stop(),
            Request::Subscribe(descriptor) => self.session.subscribe(descriptor),
            Request::Unsubscribe => self.session.unsubscribe(),
            Request::Refresh => self.session.refresh(),
            Request::Shutdown => Vec::new(),
        }
    }

    async fn execute(&mut self, actions: Vec<Action>) {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                Action::Connect => {
                    self.publish();
                    let follow_up = self.handshake().await;
                    queue.extend(follow_up);
                }
                Action::Send(command) => {
                    if let Err(e) = self.transport.send(&command).await {
                        warn!(error = %e, event = command.name(), "Failed to send command");
                        self.transport.close().await;
                        let reason = DisconnectReason::TransportError(e.to_string());
                        queue.extend(
                            self.session
                                .on_event(TransportEvent::Closed(reason), Utc::now()),
                        );
                    }
                }
                Action::Close => self.transport.close().await,
                Action::ArmTimer(delay) => self.timer = Some(Box::pin(sleep(delay))),
                Action::CancelTimer => self.timer = None,
                Action::Emit(event) => {
                    self.publish();
                    // no receivers is fine
                    let _ = self.events.send(event);
                }
            }
        }
    }

    /// Connect while still listening for requests.
    ///
    /// `Stop`, `Shutdown` or a closed request channel abandon the handshake.
    /// Other requests are held and applied once it settles, in arrival order.
    async fn handshake(&mut self) -> Vec<Action> {
        let mut held = Vec::new();
        let outcome = {
            let mut connect = self.transport.connect();
            loop {
                tokio::select! {
                    result = &mut connect => break Some(result),
                    request = self.requests.recv() => match request {
                        Some(Request::Stop) => break None,
                        Some(Request::Shutdown) | None => {
                            self.exiting = true;
                            break None;
                        }
                        Some(request) => held.push(request),
                    },
                }
            }
        };

        let abandoned = outcome.is_none();
        let mut actions = match outcome {
            Some(Ok(())) => self.session.on_open(Utc::now()),
            Some(Err(e)) => self.session.on_connect_error(e.to_string()),
            None => {
                debug!("Handshake abandoned");
                self.transport.close().await;
                Vec::new()
            }
        };
        for request in held {
            actions.extend(self.handle(request));
        }
        if abandoned {
            actions.extend(self.session.stop());
        }
        actions
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.session.snapshot());
    }
}

async fn fire(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(delay) => delay.as_mut().await,
        None => std::future::pending().await,
    }
}
