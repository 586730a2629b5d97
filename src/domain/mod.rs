//! Transport-agnostic types shared by the client and the wire protocol.

mod descriptor;
mod error;
mod state;
mod update;

pub use descriptor::SubscriptionDescriptor;
pub use error::{ConnectionError, ServerError, ServerErrorCode};
pub use state::{ConnectionState, ConnectionStats};
pub use update::{InboundUpdate, MetricValues};
