//! Device-to-many-subscribers telemetry fan-out

pub mod broadcast;
pub mod flusher;
pub mod reader;
pub mod registry;
pub mod server;
pub mod wire;

pub use broadcast::{BroadcastStats, Broadcaster};
pub use flusher::BatchFlusher;
pub use reader::SerialReader;
pub use registry::{Batch, Subscriber, SubscriberId, SubscriberRegistry};
pub use server::SubscriberServer;
