//! Fixed-interval batch flusher
//!
//! On each tick, takes the accumulation buffer in one swap-and-clear and
//! hands any non-empty contents to the broadcaster. Ticks are paced on
//! absolute deadlines so a slow cycle delays at most itself; because
//! broadcast sends are time-bounded per subscriber, a cycle cannot run
//! away far enough to skip intervals under normal operation.

use crate::buffer::AccumulationBuffer;
use crate::relay::broadcast::Broadcaster;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Periodic swap-and-broadcast driver
pub struct BatchFlusher {
    buffer: Arc<AccumulationBuffer>,
    broadcaster: Arc<Broadcaster>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

/// Poll granularity for the shutdown flag while waiting on a tick
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

impl BatchFlusher {
    /// Create a flusher over the shared buffer and broadcaster
    pub fn new(
        buffer: Arc<AccumulationBuffer>,
        broadcaster: Arc<Broadcaster>,
        interval: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            buffer,
            broadcaster,
            interval,
            shutdown,
        }
    }

    /// Run the flush loop until shutdown is signaled
    pub fn run(&self) {
        info!("Batch flusher started (interval {:?})", self.interval);
        let mut next_tick = Instant::now() + self.interval;

        while !self.shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now < next_tick {
                std::thread::sleep(SHUTDOWN_POLL.min(next_tick - now));
                continue;
            }

            // Fell behind by more than one interval: resynchronize rather
            // than firing a burst of catch-up ticks
            next_tick += self.interval;
            if next_tick < now {
                next_tick = now + self.interval;
            }

            self.flush_once();
        }

        info!("Batch flusher exiting");
    }

    /// Perform one swap-and-broadcast cycle
    ///
    /// An empty buffer is a silent no-op: no batch is produced and the
    /// broadcaster is not invoked.
    pub fn flush_once(&self) {
        let batch = self.buffer.take();
        if batch.is_empty() {
            return;
        }

        debug!("Flushing batch of {} bytes", batch.len());
        self.broadcaster.broadcast(batch);
    }
}
