//! Discovery loop orchestration.
//!
//! `start()` opens a session and spawns a loop that probes, waits, and sweeps
//! stale devices until `stop()` cancels it. Cancellation is cooperative: the
//! loop checks the flag at the top of every cycle and never abandons a probe
//! midway.

use std::net::IpAddr;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::DiscoveryConfig;
use crate::error::{CoreError, DiscoveryError};
use crate::transport::{FrameSender, UdpTransport};
use crate::types::DeviceRecord;

use super::correlator::ResponseCorrelator;
use super::events::HandlerId;
use super::probe::ProbeTransmitter;
use super::registry::DeviceRegistry;
use super::session::{SessionIdAllocator, SessionStart, SessionTracker};

/// Lifecycle state of the discovery loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    Idle,
    Running,
}

/// Discovery service: owns the session lifecycle and the device registry.
pub struct DiscoveryService<S> {
    config: DiscoveryConfig,
    allocator: SessionIdAllocator,
    sessions: Arc<SessionTracker>,
    registry: Arc<DeviceRegistry>,
    probe: Arc<ProbeTransmitter<S>>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
    receiver_task: Option<JoinHandle<()>>,
}

impl<S: FrameSender> DiscoveryService<S> {
    /// Create an idle service sending through `transport`.
    ///
    /// Inbound replies must be routed to [`Self::correlator`] by the caller.
    pub fn new(transport: Arc<S>, config: DiscoveryConfig) -> Self {
        let probe = Arc::new(ProbeTransmitter::from_config(transport, &config));
        Self {
            config,
            allocator: SessionIdAllocator::new(),
            sessions: Arc::new(SessionTracker::new()),
            registry: Arc::new(DeviceRegistry::new()),
            probe,
            loop_task: Mutex::new(None),
            receiver_task: None,
        }
    }

    /// Begin discovery. Returns the session id; if a session is already
    /// running its id is returned and nothing changes.
    pub fn start(&self) -> Result<u32, DiscoveryError> {
        let runtime = Handle::try_current().map_err(|_| DiscoveryError::NoRuntime)?;

        let (session_id, cancel) = match self.sessions.begin(&self.allocator) {
            SessionStart::AlreadyRunning { id } => {
                tracing::debug!(session = id, "discovery already running");
                return Ok(id);
            }
            SessionStart::Started { id, cancel } => (id, cancel),
        };

        let cycle = DiscoveryCycle {
            session_id,
            probe: self.probe.clone(),
            registry: self.registry.clone(),
            settle_delay: self.config.settle_delay(),
            interval: self.config.probe_interval(),
            stale_after: self.config.stale_after(),
        };

        tracing::info!(
            session = session_id,
            interval_ms = self.config.probe_interval_ms,
            "device discovery started"
        );

        let task = runtime.spawn(cycle.run(cancel));
        // A previous loop that is still winding down keeps running detached.
        *self.loop_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        Ok(session_id)
    }

    /// Request the loop to stop. Returns false if discovery was not running.
    pub fn stop(&self) -> bool {
        match self.sessions.cancel() {
            Some(session_id) => {
                tracing::info!(session = session_id, "device discovery stopped");
                true
            }
            None => false,
        }
    }

    /// Stop and wait for the loop task to exit.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self
            .loop_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "discovery loop ended abnormally");
            }
        }
    }

    pub fn state(&self) -> DiscoveryState {
        if self.sessions.active_id().is_some() {
            DiscoveryState::Running
        } else {
            DiscoveryState::Idle
        }
    }

    pub fn session_id(&self) -> Option<u32> {
        self.sessions.active_id()
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    /// Currently known devices, in discovery order.
    pub async fn list(&self) -> Vec<DeviceRecord> {
        self.registry.list().await
    }

    /// Correlator bound to this service's registry and sessions.
    pub fn correlator(&self) -> ResponseCorrelator {
        ResponseCorrelator::new(self.registry.clone(), self.sessions.clone())
    }

    pub fn on_device_discovered<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&DeviceRecord) + Send + Sync + 'static,
    {
        self.registry.on_device_discovered(handler)
    }

    pub fn on_device_lost<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&DeviceRecord) + Send + Sync + 'static,
    {
        self.registry.on_device_lost(handler)
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.registry.remove_handler(id)
    }
}

impl DiscoveryService<UdpTransport> {
    /// Bind a UDP transport and start routing its replies to this service.
    pub async fn bind(config: DiscoveryConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let transport = Arc::new(
            UdpTransport::bind(config.bind_port, config.send_timeout())
                .await
                .map_err(DiscoveryError::Bind)?,
        );

        let mut service = Self::new(transport.clone(), config);
        let correlator = service.correlator();
        service.receiver_task = Some(tokio::spawn(async move {
            transport.run_receiver(correlator).await;
        }));

        Ok(service)
    }

    /// Run one discovery session for `duration` and return what was found,
    /// sorted by host.
    pub async fn discover_once(
        config: DiscoveryConfig,
        duration: Duration,
    ) -> Result<Vec<DeviceRecord>, CoreError> {
        let service = Self::bind(config).await?;
        service.start()?;

        tokio::time::sleep(duration).await;
        service.shutdown().await;

        let mut devices = service.list().await;
        sort_by_host(&mut devices);
        Ok(devices)
    }
}

/// Order by address; hosts that are not IP literals go last, by name.
fn sort_by_host(devices: &mut [DeviceRecord]) {
    devices.sort_by_cached_key(|device| {
        let ip = device.host().parse::<IpAddr>().ok();
        (ip.is_none(), ip, device.host().to_string())
    });
}

impl<S> Drop for DiscoveryService<S> {
    fn drop(&mut self) {
        self.sessions.cancel();
        if let Some(task) = self.receiver_task.take() {
            task.abort();
        }
    }
}

/// State owned by one running loop.
struct DiscoveryCycle<S> {
    session_id: u32,
    probe: Arc<ProbeTransmitter<S>>,
    registry: Arc<DeviceRegistry>,
    settle_delay: Duration,
    interval: Duration,
    stale_after: Duration,
}

impl<S: FrameSender> DiscoveryCycle<S> {
    async fn run(self, mut cancel: watch::Receiver<bool>) {
        // Let the transport finish binding before the first probe.
        wait_or_cancel(&mut cancel, self.settle_delay).await;

        loop {
            if is_cancelled(&cancel) {
                break;
            }

            let probe = AssertUnwindSafe(self.probe.broadcast_probe(self.session_id));
            if probe.catch_unwind().await.is_err() {
                tracing::error!(session = self.session_id, "probe broadcast panicked, continuing");
            }

            wait_or_cancel(&mut cancel, self.interval).await;

            let evicted = self.registry.sweep_stale(self.stale_after).await;
            if !evicted.is_empty() {
                tracing::debug!(
                    session = self.session_id,
                    evicted = evicted.len(),
                    "swept stale devices"
                );
            }
        }

        tracing::debug!(session = self.session_id, "discovery loop exited");
    }
}

/// A dropped sender counts as cancellation so the loop cannot spin.
fn is_cancelled(cancel: &watch::Receiver<bool>) -> bool {
    *cancel.borrow() || cancel.has_changed().is_err()
}

async fn wait_or_cancel(cancel: &mut watch::Receiver<bool>, delay: Duration) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = cancel.wait_for(|cancelled| *cancelled) => {}
    }
}
