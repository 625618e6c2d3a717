//! Serial read loop
//!
//! Owns the device transport for the process lifetime and appends each
//! incoming chunk to the accumulation buffer. Opening the device is fail-
//! fast at startup (done by the caller); once running, device I/O errors
//! are logged and the loop keeps going, relaying nothing until data
//! resumes.

use crate::buffer::AccumulationBuffer;
use crate::transport::Transport;
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Read chunk size; sensor boards emit short text lines, this is plenty
const READ_CHUNK_SIZE: usize = 4096;

/// Idle sleep when the device had no data (the transport read timeout
/// already bounds each read)
const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// Backoff after a device I/O error before retrying
const ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Reads device bytes into the accumulation buffer
pub struct SerialReader {
    transport: Box<dyn Transport>,
    buffer: Arc<AccumulationBuffer>,
    shutdown: Arc<AtomicBool>,
    bytes_read: Arc<AtomicU64>,
}

impl SerialReader {
    /// Create a reader over an already-opened transport
    pub fn new(
        transport: Box<dyn Transport>,
        buffer: Arc<AccumulationBuffer>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            buffer,
            shutdown,
            bytes_read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter of total bytes read from the device
    pub fn bytes_read_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes_read)
    }

    /// Run the read loop until shutdown is signaled
    pub fn run(&mut self) {
        info!("Serial reader started");
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.transport.read(&mut chunk) {
                Ok(0) => {
                    std::thread::sleep(IDLE_SLEEP);
                }
                Ok(n) => {
                    self.buffer.append(&chunk[..n]);
                    self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
                    debug!("Read {} bytes from device", n);
                }
                Err(e) => {
                    // Non-fatal: the device may recover
                    error!("Serial read error: {}", e);
                    std::thread::sleep(ERROR_BACKOFF);
                }
            }
        }

        info!(
            "Serial reader exiting ({} bytes relayed)",
            self.bytes_read.load(Ordering::Relaxed)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::thread;

    #[test]
    fn test_reader_appends_device_bytes() {
        let transport = MockTransport::new();
        transport.inject_read(b"TDS : 812.5\n");

        let buffer = Arc::new(AccumulationBuffer::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut reader = SerialReader::new(
            Box::new(transport.clone()),
            Arc::clone(&buffer),
            Arc::clone(&shutdown),
        );

        let handle = thread::spawn(move || reader.run());

        transport.inject_read(b"pH : 6.2\n");

        // Wait for both chunks to land
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while buffer.len() < 21 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        assert_eq!(buffer.take(), b"TDS : 812.5\npH : 6.2\n");
    }

    #[test]
    fn test_read_error_is_not_fatal() {
        let transport = MockTransport::new();
        transport.fail_next_read();

        let buffer = Arc::new(AccumulationBuffer::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut reader = SerialReader::new(
            Box::new(transport.clone()),
            Arc::clone(&buffer),
            Arc::clone(&shutdown),
        );

        let handle = thread::spawn(move || reader.run());

        // Data injected after the failed read must still come through
        transport.inject_read(b"recovered");

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while buffer.is_empty() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();

        assert_eq!(buffer.take(), b"recovered");
    }
}
