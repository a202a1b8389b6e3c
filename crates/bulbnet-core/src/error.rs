//! Error types for bulbnet core.

use thiserror::Error;

/// Core error type for shared operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Device record construction errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Invalid device address: expected at least 6 bytes, got {len}")]
    InvalidIdentity { len: usize },

    #[error("Device {identity} has an empty host")]
    EmptyHost { identity: String },
}

/// Frame decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Frame too short: {len} bytes, header needs {min}")]
    TooShort { len: usize, min: usize },

    #[error("Frame size mismatch: header declares {declared} bytes, received {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error("Unsupported protocol number {0}")]
    UnsupportedProtocol(u16),

    #[error("Payload for message type {message_type} too short: need {expected} bytes, got {actual}")]
    PayloadTooShort {
        message_type: u16,
        expected: usize,
        actual: usize,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Discovery lifecycle errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery must be started from within a tokio runtime")]
    NoRuntime,

    #[error("Failed to bind discovery socket: {0}")]
    Bind(#[source] std::io::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
