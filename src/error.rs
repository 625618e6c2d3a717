//! Error types for sensor-relay

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// sensor-relay error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration serialize error
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Batch exceeds the maximum frame size
    #[error("Batch too large for one frame: {0} bytes")]
    BatchTooLarge(usize),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
