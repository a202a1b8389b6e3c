//! Registry of currently reachable devices.
//!
//! The keyed map and the insertion-ordered listing live behind one lock so
//! they always hold the same members. Events fire after the lock is released.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::DeviceError;
use crate::types::{DeviceIdentity, DeviceRecord};

use super::events::{DeviceEventKind, DeviceEvents, HandlerId};

/// Result of [`DeviceRegistry::upsert`].
#[derive(Debug, Clone)]
pub enum Upserted {
    /// First sighting; a discovered event was emitted.
    Created(DeviceRecord),
    /// Known device refreshed; no event.
    Updated(DeviceRecord),
}

impl Upserted {
    pub fn into_record(self) -> DeviceRecord {
        match self {
            Upserted::Created(record) | Upserted::Updated(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    devices: HashMap<DeviceIdentity, DeviceRecord>,
    order: Vec<DeviceIdentity>,
}

/// Shared device registry.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    inner: RwLock<RegistryInner>,
    events: DeviceEvents,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_device_discovered<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&DeviceRecord) + Send + Sync + 'static,
    {
        self.events.subscribe(DeviceEventKind::Discovered, handler)
    }

    pub fn on_device_lost<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&DeviceRecord) + Send + Sync + 'static,
    {
        self.events.subscribe(DeviceEventKind::Lost, handler)
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Insert a new device or refresh a known one.
    ///
    /// `service` and `port` are only used when the device is new.
    pub async fn upsert(
        &self,
        identity: DeviceIdentity,
        host: impl Into<String>,
        service: u8,
        port: u32,
    ) -> Result<Upserted, DeviceError> {
        self.upsert_at(identity, host, service, port, Instant::now())
            .await
    }

    pub async fn upsert_at(
        &self,
        identity: DeviceIdentity,
        host: impl Into<String>,
        service: u8,
        port: u32,
        now: Instant,
    ) -> Result<Upserted, DeviceError> {
        let upserted = {
            let mut guard = self.inner.write().await;
            let inner = &mut *guard;

            match inner.devices.get_mut(&identity) {
                Some(existing) => {
                    existing.touch(host, now)?;
                    Upserted::Updated(existing.clone())
                }
                None => {
                    let record = DeviceRecord::new(identity, host, service, port, now)?;
                    inner.order.push(identity);
                    inner.devices.insert(identity, record.clone());
                    Upserted::Created(record)
                }
            }
        };

        if let Upserted::Created(record) = &upserted {
            tracing::info!(
                device = %record.identity(),
                host = record.host(),
                port = record.port(),
                "device discovered"
            );
            self.events.emit(DeviceEventKind::Discovered, record);
        }

        Ok(upserted)
    }

    /// Refresh host and last-seen of a known device. `Ok(None)` if unknown.
    pub async fn refresh(
        &self,
        identity: &DeviceIdentity,
        host: impl Into<String>,
    ) -> Result<Option<DeviceRecord>, DeviceError> {
        self.refresh_at(identity, host, Instant::now()).await
    }

    pub async fn refresh_at(
        &self,
        identity: &DeviceIdentity,
        host: impl Into<String>,
        now: Instant,
    ) -> Result<Option<DeviceRecord>, DeviceError> {
        let mut inner = self.inner.write().await;
        match inner.devices.get_mut(identity) {
            Some(existing) => {
                existing.touch(host, now)?;
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    /// Evict every device silent for longer than `threshold`.
    pub async fn sweep_stale(&self, threshold: Duration) -> Vec<DeviceRecord> {
        self.sweep_stale_at(Instant::now(), threshold).await
    }

    pub async fn sweep_stale_at(&self, now: Instant, threshold: Duration) -> Vec<DeviceRecord> {
        let evicted: Vec<DeviceRecord> = {
            let mut guard = self.inner.write().await;
            let inner = &mut *guard;

            let stale: Vec<DeviceIdentity> = inner
                .order
                .iter()
                .filter(|id| {
                    inner
                        .devices
                        .get(*id)
                        .map_or(false, |record| record.age_at(now) > threshold)
                })
                .copied()
                .collect();

            if stale.is_empty() {
                return Vec::new();
            }

            inner.order.retain(|id| !stale.contains(id));
            stale
                .iter()
                .filter_map(|id| inner.devices.remove(id))
                .collect()
        };

        for record in &evicted {
            tracing::info!(
                device = %record.identity(),
                host = record.host(),
                silent_secs = record.age_at(now).as_secs(),
                "device lost"
            );
            self.events.emit(DeviceEventKind::Lost, record);
        }

        evicted
    }

    /// Snapshot of all devices in discovery order.
    pub async fn list(&self) -> Vec<DeviceRecord> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.devices.get(id))
            .cloned()
            .collect()
    }

    pub async fn get(&self, identity: &DeviceIdentity) -> Option<DeviceRecord> {
        self.inner.read().await.devices.get(identity).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.devices.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every record without emitting events. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.write().await;
        let removed = inner.devices.len();
        inner.devices.clear();
        inner.order.clear();
        removed
    }
}
