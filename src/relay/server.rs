//! Subscriber connection acceptor
//!
//! Binds the TCP listener (fail-fast at startup) and runs a non-blocking
//! accept loop. Each accepted connection gets a bounded batch queue
//! registered with the subscriber registry and a pair of threads:
//!
//! - a writer thread that drains the queue and writes each batch to the
//!   socket as one length-prefixed frame
//! - a drain thread that reads and discards anything the subscriber sends
//!   (the protocol is output-only) and unregisters on close or error
//!
//! Either thread unregistering drops the queue sender held by the
//! registry; the writer then sees a disconnected channel and exits,
//! closing the socket.

use crate::error::Result;
use crate::relay::registry::{Batch, SubscriberId, SubscriberRegistry};
use crate::relay::wire;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use log::{debug, error, info, trace, warn};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the writer blocks on its queue before re-checking shutdown
const WRITER_RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Accepts subscriber connections and wires them into the registry
pub struct SubscriberServer {
    listener: TcpListener,
    registry: Arc<SubscriberRegistry>,
    shutdown: Arc<AtomicBool>,
    queue_capacity: usize,
}

impl SubscriberServer {
    /// Bind the listening socket
    ///
    /// A bind failure is fatal and propagates to the caller; the daemon
    /// has nothing to relay to without a listener.
    pub fn bind(
        bind_address: &str,
        registry: Arc<SubscriberRegistry>,
        shutdown: Arc<AtomicBool>,
        queue_capacity: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(bind_address)?;
        listener.set_nonblocking(true)?;
        info!("Subscriber server listening on {}", bind_address);

        Ok(Self {
            listener,
            registry,
            shutdown,
            queue_capacity,
        })
    }

    /// Address the listener actually bound to (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop until shutdown is signaled
    pub fn run(&self) {
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = self.attach_subscriber(stream, addr) {
                        // Isolated to this connection; keep accepting
                        warn!("Failed to attach subscriber {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }

        info!("Subscriber server exiting");
    }

    /// Register one accepted connection and spawn its writer/drain threads
    fn attach_subscriber(&self, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;

        let (tx, rx) = bounded::<Batch>(self.queue_capacity);
        let id = self.registry.register(addr.to_string(), tx);
        info!("Subscriber {} connected from {}", id, addr);

        let drain_stream = stream.try_clone()?;

        let writer_shutdown = Arc::clone(&self.shutdown);
        let writer_registry = Arc::clone(&self.registry);
        std::thread::Builder::new()
            .name(format!("subscriber-writer-{}", id))
            .spawn(move || {
                writer_loop(stream, id, rx, &writer_registry, &writer_shutdown);
            })?;

        let drain_shutdown = Arc::clone(&self.shutdown);
        let drain_registry = Arc::clone(&self.registry);
        std::thread::Builder::new()
            .name(format!("subscriber-drain-{}", id))
            .spawn(move || {
                drain_loop(drain_stream, id, &drain_registry, &drain_shutdown);
            })?;

        Ok(())
    }
}

/// Drain the subscriber's queue, framing each batch onto the socket
fn writer_loop(
    mut stream: TcpStream,
    id: SubscriberId,
    rx: Receiver<Batch>,
    registry: &SubscriberRegistry,
    shutdown: &AtomicBool,
) {
    debug!("Writer thread started for subscriber {}", id);
    let mut frame = Vec::with_capacity(4096);

    while !shutdown.load(Ordering::Relaxed) {
        let batch = match rx.recv_timeout(WRITER_RECV_TIMEOUT) {
            Ok(batch) => batch,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                // Evicted or unregistered; nothing more to deliver
                break;
            }
        };

        if let Err(e) = wire::encode_frame(&batch, &mut frame) {
            // Oversized batch: drop it, keep the connection
            error!("Dropping batch for subscriber {}: {}", id, e);
            continue;
        }

        if let Err(e) = stream.write_all(&frame) {
            debug!("Write to subscriber {} failed: {}", id, e);
            registry.unregister(id);
            break;
        }
    }

    // Tear the connection down so the drain thread sees EOF promptly
    let _ = stream.shutdown(std::net::Shutdown::Both);
    debug!("Writer thread exiting for subscriber {}", id);
}

/// Read and discard inbound bytes; unregister on close or error
fn drain_loop(
    mut stream: TcpStream,
    id: SubscriberId,
    registry: &SubscriberRegistry,
    shutdown: &AtomicBool,
) {
    // Bounded reads so the thread notices shutdown
    if let Err(e) = stream.set_read_timeout(Some(Duration::from_millis(500))) {
        warn!("Failed to set read timeout for subscriber {}: {}", id, e);
    }

    let mut scratch = [0u8; 1024];
    while !shutdown.load(Ordering::Relaxed) {
        match stream.read(&mut scratch) {
            Ok(0) => {
                info!("Subscriber {} disconnected", id);
                registry.unregister(id);
                break;
            }
            Ok(n) => {
                // Output-only protocol: inbound bytes are ignored
                trace!("Ignoring {} inbound bytes from subscriber {}", n, id);
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                debug!("Subscriber {} connection error: {}", id, e);
                registry.unregister(id);
                break;
            }
        }
    }
}
