//! Matches inbound service replies to the active discovery session.
//!
//! Known devices are refreshed on any reply, session or not, so background
//! traffic keeps them from being evicted. Unknown devices are only accepted
//! when the reply carries the id of the live session; anything else is a
//! late or foreign reply and is dropped without error.

use std::net::IpAddr;
use std::sync::Arc;

use crate::protocol::{Frame, StateService};
use crate::types::DeviceIdentity;

use super::registry::DeviceRegistry;
use super::session::SessionTracker;

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// New device accepted into the registry.
    Discovered(DeviceIdentity),
    /// Known device; host and last-seen refreshed.
    Refreshed(DeviceIdentity),
    /// Unknown device and no session running.
    NoSession,
    /// Unknown device replying to a session other than the live one.
    ForeignSession { source: u32, active: u32 },
    /// Message could not be turned into a device record.
    Rejected,
}

/// Routes decoded replies into the registry.
#[derive(Debug, Clone)]
pub struct ResponseCorrelator {
    registry: Arc<DeviceRegistry>,
    sessions: Arc<SessionTracker>,
}

impl ResponseCorrelator {
    pub fn new(registry: Arc<DeviceRegistry>, sessions: Arc<SessionTracker>) -> Self {
        Self { registry, sessions }
    }

    pub async fn on_inbound_message(
        &self,
        remote_addr: IpAddr,
        remote_port: u16,
        frame: &Frame,
    ) -> Correlation {
        let identity = match DeviceIdentity::from_bytes(&frame.header.target) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::debug!(from = %remote_addr, error = %e, "discarding reply without device address");
                return Correlation::Rejected;
            }
        };
        let host = remote_addr.to_string();

        match self.registry.refresh(&identity, host.as_str()).await {
            Ok(Some(_)) => {
                tracing::trace!(device = %identity, host = %host, remote_port, "device refreshed");
                return Correlation::Refreshed(identity);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::debug!(device = %identity, error = %e, "discarding reply");
                return Correlation::Rejected;
            }
        }

        let active = match self.sessions.active_id() {
            Some(active) => active,
            None => {
                tracing::trace!(device = %identity, "reply outside a discovery session");
                return Correlation::NoSession;
            }
        };
        if frame.source() != active {
            tracing::debug!(
                device = %identity,
                source = frame.source(),
                session = active,
                "reply for another session"
            );
            return Correlation::ForeignSession {
                source: frame.source(),
                active,
            };
        }

        let service = match StateService::parse(&frame.payload) {
            Ok(service) => service,
            Err(e) => {
                tracing::debug!(device = %identity, error = %e, "malformed service reply");
                return Correlation::Rejected;
            }
        };

        match self
            .registry
            .upsert(identity, host, service.service, service.port)
            .await
        {
            Ok(upserted) if upserted.is_created() => Correlation::Discovered(identity),
            // Another reply registered it first.
            Ok(_) => Correlation::Refreshed(identity),
            Err(e) => {
                tracing::debug!(device = %identity, error = %e, "discarding reply");
                Correlation::Rejected
            }
        }
    }
}
