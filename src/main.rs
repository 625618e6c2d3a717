//! sensor-relay - Serial-to-TCP telemetry fan-out daemon
//!
//! Reads raw bytes from a serial-attached sensor device, accumulates them
//! for one flush interval, and broadcasts each batch to every connected
//! TCP subscriber as a length-prefixed frame.

use sensor_relay::app::RelayApp;
use sensor_relay::config::AppConfig;
use sensor_relay::error::Result;
use std::env;
use std::path::Path;

/// Default config path when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "/etc/sensor-relay.toml";

/// Parse config path from command line arguments.
///
/// Supports:
/// - `sensor-relay <path>` (positional)
/// - `sensor-relay --config <path>` (flag-based)
/// - `sensor-relay -c <path>` (short flag)
///
/// Returns the path and whether it was given explicitly.
fn parse_config_path() -> (String, bool) {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return (args[i + 1].clone(), true);
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return (args[1].clone(), true);
    }

    (DEFAULT_CONFIG_PATH.to_string(), false)
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("sensor-relay v{} starting...", env!("CARGO_PKG_VERSION"));

    let (config_path, explicit) = parse_config_path();

    // An explicitly given config must load; the default path is allowed
    // to be absent, falling back to built-in defaults.
    let config = if explicit || Path::new(&config_path).exists() {
        log::info!("Using config: {}", config_path);
        AppConfig::from_file(&config_path)?
    } else {
        log::warn!(
            "No config at {}, using built-in defaults",
            DEFAULT_CONFIG_PATH
        );
        AppConfig::default()
    };

    log::info!(
        "Device: {} at {} baud, flushing every {} ms, listening on {}",
        config.device.port,
        config.device.baud_rate,
        config.relay.flush_interval_ms,
        config.network.bind_address
    );

    let mut app = RelayApp::new(&config)?;
    app.run()?;

    log::info!("sensor-relay stopped");
    Ok(())
}
