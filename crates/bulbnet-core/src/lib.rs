//! Core library for finding UDP-broadcast light devices on the local network.
//!
//! [`DiscoveryService`] runs the probe loop and keeps a [`DeviceRegistry`] of
//! devices that answered, evicting those that stop answering.

pub mod config;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod types;

pub use config::DiscoveryConfig;
pub use discovery::{
    Correlation, DeviceEventKind, DeviceRegistry, DiscoveryService, DiscoveryState, HandlerId,
    ResponseCorrelator,
};
pub use error::{ConfigError, CoreError, DeviceError, DiscoveryError, ProtocolError, Result};
pub use transport::{FrameSender, UdpTransport};
pub use types::{DeviceIdentity, DeviceRecord};
