//! Accumulation buffer between the serial reader and the batch flusher
//!
//! A single lock-guarded byte buffer. The serial reader appends chunks as
//! they arrive; the flusher takes the whole contents in one swap-and-clear.
//! The lock guarantees an append is never split across a take: every chunk
//! lands entirely in one batch or entirely in the next.

use parking_lot::Mutex;

/// Lock-guarded append/take byte buffer
#[derive(Default)]
pub struct AccumulationBuffer {
    inner: Mutex<Vec<u8>>,
}

impl AccumulationBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of bytes
    pub fn append(&self, chunk: &[u8]) {
        self.inner.lock().extend_from_slice(chunk);
    }

    /// Take the accumulated contents, leaving the buffer empty
    ///
    /// Returns an empty vec if nothing has accumulated since the last take.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Number of bytes currently accumulated
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the buffer is currently empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_append_then_take() {
        let buffer = AccumulationBuffer::new();
        buffer.append(b"TDS : 812.5\n");
        buffer.append(b"pH : 6.2\n");

        assert_eq!(buffer.len(), 21);
        assert_eq!(buffer.take(), b"TDS : 812.5\npH : 6.2\n");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_take_empty_is_empty() {
        let buffer = AccumulationBuffer::new();
        assert!(buffer.take().is_empty());
        buffer.append(b"x");
        buffer.take();
        assert!(buffer.take().is_empty());
    }

    #[test]
    fn test_concurrent_append_take_loses_nothing() {
        // One appender writes a known byte sequence in small chunks while a
        // taker drains concurrently. The concatenation of all takes must
        // equal the appended sequence, with no chunk split or duplicated.
        let buffer = Arc::new(AccumulationBuffer::new());
        let source: Vec<u8> = (0..200u32).flat_map(|i| i.to_le_bytes()).collect();

        let appender = {
            let buffer = Arc::clone(&buffer);
            let source = source.clone();
            thread::spawn(move || {
                for chunk in source.chunks(7) {
                    buffer.append(chunk);
                    std::thread::yield_now();
                }
            })
        };

        let mut delivered = Vec::new();
        while !appender.is_finished() {
            delivered.extend(buffer.take());
        }
        appender.join().unwrap();
        delivered.extend(buffer.take());

        assert_eq!(delivered, source);
    }
}
