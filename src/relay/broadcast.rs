//! Batch fan-out to connected subscribers
//!
//! Each broadcast takes a snapshot of the registry and offers the batch to
//! every member's bounded queue with a send timeout. Failures are strictly
//! per-subscriber: a closed or persistently full queue evicts that
//! subscriber and delivery continues to the rest. Nothing here can stall
//! the flush cycle longer than `send_timeout` per misbehaving subscriber.

use crate::relay::registry::{Batch, Subscriber, SubscriberRegistry};
use crossbeam_channel::SendTimeoutError;
use log::{debug, trace, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delivers flush batches to every registered subscriber
pub struct Broadcaster {
    registry: Arc<SubscriberRegistry>,
    send_timeout: Duration,
    batches_sent: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
}

/// Broadcast counters for the stats log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastStats {
    /// Non-empty batches broadcast
    pub batches_sent: u64,
    /// Successful per-subscriber deliveries
    pub deliveries: u64,
    /// Subscribers evicted for delivery failure
    pub evictions: u64,
}

impl Broadcaster {
    /// Create a broadcaster over the given registry
    pub fn new(registry: Arc<SubscriberRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
            batches_sent: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Deliver one batch to every currently registered subscriber
    ///
    /// A batch offered to an empty registry is discarded silently. Each
    /// subscriber is attempted independently; a failure evicts only that
    /// subscriber.
    pub fn broadcast(&self, batch: Vec<u8>) {
        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            trace!("No subscribers connected, discarding {} bytes", batch.len());
            return;
        }

        debug!(
            "Broadcasting {} bytes to {} subscribers",
            batch.len(),
            snapshot.len()
        );
        self.batches_sent.fetch_add(1, Ordering::Relaxed);

        let batch: Batch = Arc::new(batch);
        for subscriber in snapshot {
            match subscriber
                .sender
                .send_timeout(Arc::clone(&batch), self.send_timeout)
            {
                Ok(()) => {
                    self.deliveries.fetch_add(1, Ordering::Relaxed);
                }
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!(
                        "Subscriber {} ({}) queue full past {:?}, evicting",
                        subscriber.id, subscriber.peer, self.send_timeout
                    );
                    self.evict(&subscriber);
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    debug!(
                        "Subscriber {} ({}) channel closed, evicting",
                        subscriber.id, subscriber.peer
                    );
                    self.evict(&subscriber);
                }
            }
        }
    }

    fn evict(&self, subscriber: &Subscriber) {
        if self.registry.unregister(subscriber.id) {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current broadcast counters
    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
