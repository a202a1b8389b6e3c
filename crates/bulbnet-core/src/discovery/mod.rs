//! LAN device discovery.
//!
//! Probes are broadcast under a session id; replies carrying that id register
//! new devices, and any reply from a known device keeps it alive. Devices that
//! go silent for longer than the stale threshold are evicted by the loop.

pub mod correlator;
pub mod events;
pub mod probe;
pub mod registry;
pub mod service;
pub mod session;
pub mod subnet;

pub use correlator::{Correlation, ResponseCorrelator};
pub use events::{DeviceEventKind, DeviceEvents, DeviceHandler, HandlerId};
pub use probe::{ProbeTargets, ProbeTransmitter};
pub use registry::{DeviceRegistry, Upserted};
pub use service::{DiscoveryService, DiscoveryState};
pub use session::{SessionIdAllocator, SessionStart, SessionTracker};
pub use subnet::{broadcast_targets_from, resolve_broadcast_targets};
