//! Configuration for the sensor-relay daemon
//!
//! Loads configuration from a TOML file with the minimal parameters needed
//! to relay one serial device to TCP subscribers.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial device configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0")
    pub port: String,
    /// Baud rate (e.g., 9600)
    pub baud_rate: u32,
}

/// Relay timing and backpressure configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Interval between buffer flush-and-broadcast cycles, in milliseconds
    pub flush_interval_ms: u64,
    /// Per-subscriber outbound queue depth, in batches
    pub queue_capacity: usize,
    /// How long a broadcast waits on one subscriber's full queue before
    /// evicting it, in milliseconds
    pub send_timeout_ms: u64,
}

/// TCP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Bind address for inbound subscriber connections
    ///
    /// Examples:
    /// - `0.0.0.0:8080` - Bind to all interfaces on port 8080
    /// - `127.0.0.1:8080` - Localhost only
    pub bind_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            flush_interval_ms: 1000,
            queue_capacity: 64,
            send_timeout_ms: 100,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default configuration matching the original deployment: a 9600-baud
    /// sensor board relayed on port 8080 with a 1-second flush window.
    ///
    /// Suitable for testing and development. Production deployments should
    /// use a TOML configuration file.
    pub fn relay_defaults() -> Self {
        Self {
            device: DeviceConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud_rate: 9600,
            },
            relay: RelayConfig::default(),
            network: NetworkConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::relay_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::relay_defaults();
        assert_eq!(config.device.port, "/dev/ttyUSB0");
        assert_eq!(config.device.baud_rate, 9600);
        assert_eq!(config.relay.flush_interval_ms, 1000);
        assert_eq!(config.network.bind_address, "0.0.0.0:8080");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_serialization() {
        let config = AppConfig::relay_defaults();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        // Should contain all sections
        assert!(toml_string.contains("[device]"));
        assert!(toml_string.contains("[relay]"));
        assert!(toml_string.contains("[network]"));
        assert!(toml_string.contains("[logging]"));

        // Should contain key values
        assert!(toml_string.contains("baud_rate = 9600"));
        assert!(toml_string.contains("port = \"/dev/ttyUSB0\""));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[device]
port = "/dev/ttyACM0"
baud_rate = 115200

[relay]
flush_interval_ms = 250
queue_capacity = 32
send_timeout_ms = 50

[network]
bind_address = "127.0.0.1:9000"

[logging]
level = "debug"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.device.port, "/dev/ttyACM0");
        assert_eq!(config.device.baud_rate, 115200);
        assert_eq!(config.relay.flush_interval_ms, 250);
        assert_eq!(config.relay.queue_capacity, 32);
        assert_eq!(config.network.bind_address, "127.0.0.1:9000");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_optional_sections_default() {
        // Only [device] is mandatory; everything else has defaults
        let toml_content = r#"
[device]
port = "/dev/ttyS1"
baud_rate = 9600
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.relay.flush_interval_ms, 1000);
        assert_eq!(config.relay.queue_capacity, 64);
        assert_eq!(config.network.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");

        let config = AppConfig::relay_defaults();
        config.to_file(&path).unwrap();

        let loaded = AppConfig::from_file(&path).unwrap();
        assert_eq!(loaded.device.port, config.device.port);
        assert_eq!(loaded.relay.send_timeout_ms, config.relay.send_timeout_ms);
    }
}
