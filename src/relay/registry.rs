//! Subscriber registry
//!
//! Tracks the set of currently connected subscribers. The acceptor inserts
//! on connect; the broadcaster evicts on delivery failure; connection
//! threads evict on close. All mutation goes through one lock, and the
//! broadcaster iterates a point-in-time snapshot rather than the live map,
//! so eviction during a broadcast cannot corrupt the in-flight iteration.

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// One flush cycle's worth of bytes, shared across subscriber queues
pub type Batch = Arc<Vec<u8>>;

/// Unique identifier for a connected subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One connected subscriber's delivery handle
///
/// Dropping the last clone of `sender` disconnects the subscriber's writer
/// thread, which closes the TCP connection.
#[derive(Clone)]
pub struct Subscriber {
    pub id: SubscriberId,
    /// Peer address, for logging
    pub peer: String,
    /// Bounded outbound batch queue, drained by the writer thread
    pub sender: Sender<Batch>,
}

/// Registry of currently connected subscribers
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly connected subscriber, returning its assigned id
    pub fn register(&self, peer: String, sender: Sender<Batch>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber = Subscriber {
            id,
            peer,
            sender,
        };
        self.subscribers.lock().insert(id.0, subscriber);
        log::info!("Subscriber {} registered ({} connected)", id, self.len());
        id
    }

    /// Remove a subscriber
    ///
    /// Idempotent: unregistering an id that is not a member is a no-op.
    /// Returns whether the subscriber was present.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.lock().remove(&id.0).is_some();
        if removed {
            log::info!("Subscriber {} unregistered ({} connected)", id, self.len());
        }
        removed
    }

    /// Point-in-time snapshot of the current membership
    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.lock().values().cloned().collect()
    }

    /// Number of currently connected subscribers
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Whether no subscribers are connected
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}
