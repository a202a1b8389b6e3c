//! Shared device types.
//!
//! Records are serialized with camelCase keys so CLI JSON output stays stable.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tokio::time::Instant;

use crate::error::DeviceError;

/// Number of address bytes that identify a device.
pub const IDENTITY_LEN: usize = 6;

/// Stable device identity derived from its hardware address.
///
/// Two records with the same identity are the same physical device, whatever
/// host they were last seen at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIdentity([u8; IDENTITY_LEN]);

impl DeviceIdentity {
    pub fn new(bytes: [u8; IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Build an identity from the leading bytes of a target/address field.
    ///
    /// Extra trailing bytes (the frame header pads the address to 8) are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeviceError> {
        let head = bytes
            .get(..IDENTITY_LEN)
            .ok_or(DeviceError::InvalidIdentity { len: bytes.len() })?;
        let mut out = [0u8; IDENTITY_LEN];
        out.copy_from_slice(head);
        Ok(Self(out))
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl Serialize for DeviceIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A known device.
///
/// Identity, service and port are fixed at construction. Host and last-seen
/// change on every fresh sighting, and only the registry can change them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    identity: DeviceIdentity,
    host: String,
    service: u8,
    port: u32,
    #[serde(rename = "lastSeen")]
    seen_at: DateTime<Utc>,
    #[serde(skip)]
    last_seen: Instant,
}

impl DeviceRecord {
    pub(crate) fn new(
        identity: DeviceIdentity,
        host: impl Into<String>,
        service: u8,
        port: u32,
        now: Instant,
    ) -> Result<Self, DeviceError> {
        let host = validate_host(&identity, host.into())?;
        Ok(Self {
            identity,
            host,
            service,
            port,
            seen_at: Utc::now(),
            last_seen: now,
        })
    }

    /// Record a fresh sighting from `host`.
    pub(crate) fn touch(&mut self, host: impl Into<String>, now: Instant) -> Result<(), DeviceError> {
        self.host = validate_host(&self.identity, host.into())?;
        self.last_seen = now;
        self.seen_at = Utc::now();
        Ok(())
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn service(&self) -> u8 {
        self.service
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    /// Wall-clock time of the last sighting.
    pub fn seen_at(&self) -> DateTime<Utc> {
        self.seen_at
    }

    /// Monotonic time of the last sighting, used for staleness.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Time elapsed between the last sighting and `now`.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// Human-readable name of the advertised service.
    pub fn service_name(&self) -> &'static str {
        match self.service {
            1 => "udp",
            _ => "unknown",
        }
    }
}

fn validate_host(identity: &DeviceIdentity, host: String) -> Result<String, DeviceError> {
    if host.trim().is_empty() {
        return Err(DeviceError::EmptyHost {
            identity: identity.to_string(),
        });
    }
    Ok(host)
}
