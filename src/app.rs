//! Application orchestration for the sensor-relay daemon
//!
//! Manages device and listener startup, the relay threads, and graceful
//! shutdown.

use crate::buffer::AccumulationBuffer;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::relay::{BatchFlusher, Broadcaster, SerialReader, SubscriberRegistry, SubscriberServer};
use crate::transport::{SerialTransport, Transport};
use log::{debug, error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main application structure that manages all relay components
pub struct RelayApp {
    registry: Arc<SubscriberRegistry>,
    broadcaster: Arc<Broadcaster>,
    reader: Option<SerialReader>,
    flusher: Option<BatchFlusher>,
    server: Option<SubscriberServer>,
    bytes_read: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
}

impl RelayApp {
    /// Create a new RelayApp from configuration
    ///
    /// Opens the serial device and binds the listener; failure of either
    /// is fatal, since without them there is nothing to relay.
    pub fn new(config: &AppConfig) -> Result<Self> {
        info!("Initializing sensor-relay");

        let transport = SerialTransport::open(&config.device.port, config.device.baud_rate)?;
        Self::with_transport(config, Box::new(transport))
    }

    /// Create a RelayApp over an already-opened transport
    ///
    /// Used by tests to run the full relay against a mock device.
    pub fn with_transport(config: &AppConfig, transport: Box<dyn Transport>) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let buffer = Arc::new(AccumulationBuffer::new());
        let registry = Arc::new(SubscriberRegistry::new());

        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&registry),
            Duration::from_millis(config.relay.send_timeout_ms),
        ));

        let reader = SerialReader::new(transport, Arc::clone(&buffer), Arc::clone(&shutdown));
        let bytes_read = reader.bytes_read_counter();

        let flusher = BatchFlusher::new(
            Arc::clone(&buffer),
            Arc::clone(&broadcaster),
            Duration::from_millis(config.relay.flush_interval_ms),
            Arc::clone(&shutdown),
        );

        let server = SubscriberServer::bind(
            &config.network.bind_address,
            Arc::clone(&registry),
            Arc::clone(&shutdown),
            config.relay.queue_capacity,
        )?;

        info!("Device and listener initialized");

        Ok(Self {
            registry,
            broadcaster,
            reader: Some(reader),
            flusher: Some(flusher),
            server: Some(server),
            bytes_read,
            shutdown,
        })
    }

    /// Address the subscriber listener bound to
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        match &self.server {
            Some(server) => server.local_addr(),
            None => Err(Error::Other("server already started".to_string())),
        }
    }

    /// Start all relay threads and run until a shutdown signal arrives
    pub fn run(&mut self) -> Result<()> {
        self.start_threads()?;
        self.setup_signal_handler();

        info!("sensor-relay running. Press Ctrl-C to stop.");

        // Main loop - keep alive while relaying
        let mut last_stats = Instant::now();
        while !self.shutdown.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(100));

            // Print statistics every 10 seconds
            if last_stats.elapsed().as_secs() >= 10 {
                self.log_statistics();
                last_stats = Instant::now();
            }
        }

        info!("Shutdown signal received, stopping threads...");
        self.stop();
        Ok(())
    }

    /// Spawn the reader, flusher, and acceptor threads
    ///
    /// Public so tests can drive the app without the signal handler or
    /// the blocking main loop.
    pub fn start_threads(&mut self) -> Result<()> {
        let mut reader = self
            .reader
            .take()
            .ok_or_else(|| Error::Other("relay threads already started".to_string()))?;
        let flusher = self
            .flusher
            .take()
            .ok_or_else(|| Error::Other("relay threads already started".to_string()))?;
        let server = self
            .server
            .take()
            .ok_or_else(|| Error::Other("relay threads already started".to_string()))?;

        std::thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn(move || reader.run())?;

        std::thread::Builder::new()
            .name("batch-flusher".to_string())
            .spawn(move || flusher.run())?;

        std::thread::Builder::new()
            .name("subscriber-server".to_string())
            .spawn(move || server.run())?;

        info!("Relay threads started");
        Ok(())
    }

    /// Setup signal handler for graceful shutdown
    fn setup_signal_handler(&self) {
        let shutdown = Arc::clone(&self.shutdown);

        match Signals::new([SIGINT, SIGTERM]) {
            Ok(mut signals) => {
                std::thread::Builder::new()
                    .name("signal-handler".to_string())
                    .spawn(move || {
                        if let Some(sig) = signals.forever().next() {
                            info!("Received signal {:?}, initiating shutdown...", sig);
                            shutdown.store(true, Ordering::Relaxed);
                        }
                    })
                    .ok();
            }
            Err(e) => error!("Failed to register signal handlers: {}", e),
        }
    }

    /// Log relay statistics
    fn log_statistics(&self) {
        let stats = self.broadcaster.stats();
        info!(
            "Relaying: {} bytes read, {} batches broadcast, {} deliveries, {} evictions, {} subscribers",
            self.bytes_read.load(Ordering::Relaxed),
            stats.batches_sent,
            stats.deliveries,
            stats.evictions,
            self.registry.len()
        );
    }

    /// Signal all threads to stop and give them a moment to wind down
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // Loops poll the flag at <=100ms granularity
        std::thread::sleep(Duration::from_millis(200));
        info!("sensor-relay stopped");
    }
}

impl Drop for RelayApp {
    fn drop(&mut self) {
        debug!("RelayApp cleaning up...");
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
