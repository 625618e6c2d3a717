//! Transport layer for device I/O abstraction
//!
//! The relay only consumes bytes from the device; the transport surface is
//! read-only by design.

use crate::error::Result;

mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Transport trait for the sensor device byte stream
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    ///
    /// A return of `Ok(0)` means no data was available within the
    /// transport's read timeout, not end-of-stream.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Check if data is available to read
    fn available(&mut self) -> Result<usize> {
        Ok(0) // Default implementation
    }
}
