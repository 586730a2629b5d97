//! Pulsewire - Real-time campaign metrics over a push-service WebSocket.
//!
//! This crate keeps one long-lived connection to the metrics push service,
//! holds at most one active subscription on it and replays that subscription
//! after every reconnect.
//!
//! # Architecture
//!
//! - **`client::Session`** - Synchronous state machine
//!   - Connection manager: lifecycle, exponential backoff, attempt budget
//!   - Subscription tracker: desired descriptor, confirmation, replay
//!   - Update sink: latest update and freshness counters
//!
//! - **`client::MetricsClient`** - Tokio task executing the session's actions
//!   against a [`transport::Transport`]
//!
//! - **`client::ScopedSubscription`** - Campaign and account helpers that
//!   derive descriptors from caller intent
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files and environment
//! - [`domain`] - Descriptors, updates, connection state and error kinds
//! - [`protocol`] - JSON envelope codec for commands and server events
//! - [`transport`] - Transport trait and the WebSocket implementation
//! - [`client`] - The client task, its handle and derived subscriptions
//! - [`cli`] - Command handlers for the `pulsewire` binary
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Mock transports and fixtures for integration tests
//!
//! # Example
//!
//! ```no_run
//! use pulsewire::client::{AccountMetrics, MetricsClient, ScopedSubscription};
//! use pulsewire::config::Config;
//! use pulsewire::transport::WebSocketTransport;
//!
//! # async fn demo() -> pulsewire::error::Result<()> {
//! let config = Config::default();
//! let transport = WebSocketTransport::from_config(&config.stream)?;
//! let (client, _task) = MetricsClient::spawn(transport, config.reconnect);
//! client.start();
//!
//! let _scope = ScopedSubscription::new(client.clone(), AccountMetrics::new("u1", ["roas"]));
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod protocol;
pub mod transport;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
