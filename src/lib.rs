//! sensor-relay - Serial-to-TCP telemetry fan-out daemon
//!
//! Relays the raw byte stream of a serial-attached sensor device to any
//! number of TCP subscribers. Bytes are accumulated as they arrive,
//! flushed on a fixed interval as one immutable batch, and fanned out to
//! every connected subscriber as a length-prefixed frame. A slow or
//! broken subscriber is evicted without affecting the others or the
//! flush cycle.

pub mod app;
pub mod buffer;
pub mod config;
pub mod error;
pub mod relay;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
