//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`transport`] - Mock [`Transport`](crate::transport::Transport)
//!   implementations: `ScriptedTransport`, `ChannelTransport`.
//! - [`fixtures`] - Builders for descriptors, server events and the
//!   default reconnection config.

pub mod fixtures;
pub mod transport;
