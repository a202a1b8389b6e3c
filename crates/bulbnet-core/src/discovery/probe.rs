//! Probe fan-out to every broadcast target.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use futures::future::join_all;

use crate::config::DiscoveryConfig;
use crate::protocol::Frame;
use crate::transport::FrameSender;

use super::subnet::resolve_broadcast_targets;

/// Where probes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTargets {
    /// Re-resolved from local interfaces before every probe.
    Interfaces,
    /// Fixed list from configuration.
    Fixed(Vec<Ipv4Addr>),
}

/// Sends a session-tagged probe to each target.
pub struct ProbeTransmitter<S> {
    sender: Arc<S>,
    port: u16,
    targets: ProbeTargets,
}

impl<S: FrameSender> ProbeTransmitter<S> {
    pub fn new(sender: Arc<S>, port: u16, targets: ProbeTargets) -> Self {
        Self {
            sender,
            port,
            targets,
        }
    }

    pub fn from_config(sender: Arc<S>, config: &DiscoveryConfig) -> Self {
        let targets = match &config.broadcast_targets {
            Some(fixed) => ProbeTargets::Fixed(fixed.clone()),
            None => ProbeTargets::Interfaces,
        };
        Self::new(sender, config.device_port, targets)
    }

    pub fn targets(&self) -> Vec<Ipv4Addr> {
        match &self.targets {
            ProbeTargets::Interfaces => resolve_broadcast_targets(),
            ProbeTargets::Fixed(fixed) => fixed.clone(),
        }
    }

    /// Probe every current target.
    pub async fn broadcast_probe(&self, session_id: u32) {
        let targets = self.targets();
        self.broadcast_probe_to(session_id, &targets).await;
    }

    /// Probe the given targets concurrently.
    ///
    /// Failures are logged per target and never stop the remaining sends.
    pub async fn broadcast_probe_to(&self, session_id: u32, targets: &[Ipv4Addr]) {
        let frame = Frame::get_service(session_id).encode();

        tracing::debug!(
            session = session_id,
            targets = targets.len(),
            "broadcasting discovery probe"
        );

        let sends = targets.iter().map(|ip| {
            let dest = SocketAddr::from((*ip, self.port));
            let frame = frame.clone();
            async move { (dest, self.sender.send_frame(dest, frame).await) }
        });

        for (dest, result) in join_all(sends).await {
            match result {
                Ok(()) => tracing::trace!(session = session_id, target = %dest, "probe sent"),
                Err(e) => tracing::warn!(
                    session = session_id,
                    target = %dest,
                    error = %e,
                    "probe send failed"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message_type;
    use crate::transport::mock::RecordingSender;
    use std::net::IpAddr;

    fn targets() -> Vec<Ipv4Addr> {
        vec![
            Ipv4Addr::new(10, 0, 0, 255),
            Ipv4Addr::new(192, 168, 1, 255),
            Ipv4Addr::new(192, 168, 2, 255),
        ]
    }

    #[tokio::test]
    async fn test_probe_reaches_every_target_with_session_id() {
        let sender = Arc::new(RecordingSender::default());
        let probe = ProbeTransmitter::new(sender.clone(), 56700, ProbeTargets::Fixed(targets()));

        probe.broadcast_probe(42).await;

        let dests = sender.destinations();
        assert_eq!(dests.len(), 3);
        for ip in targets() {
            assert!(dests.contains(&SocketAddr::from((ip, 56700))));
        }
        for frame in sender.frames() {
            assert_eq!(frame.source(), 42);
            assert_eq!(frame.message_type(), message_type::GET_SERVICE);
            assert!(frame.header.tagged);
        }
    }

    #[tokio::test]
    async fn test_partial_failure_still_sends_to_remaining_target() {
        let sender = Arc::new(RecordingSender::failing([
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, 255)),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 255)),
        ]));
        let probe = ProbeTransmitter::new(sender.clone(), 56700, ProbeTargets::Interfaces);

        probe.broadcast_probe_to(3, &targets()).await;

        assert_eq!(sender.count(), 3);
        assert!(sender
            .destinations()
            .contains(&SocketAddr::from((Ipv4Addr::new(192, 168, 2, 255), 56700))));
    }

    #[test]
    fn test_from_config_prefers_fixed_targets() {
        let sender = Arc::new(RecordingSender::default());
        let config = DiscoveryConfig {
            broadcast_targets: Some(vec![Ipv4Addr::new(10, 1, 1, 255)]),
            device_port: 9999,
            ..Default::default()
        };

        let probe = ProbeTransmitter::from_config(sender, &config);

        assert_eq!(probe.targets(), vec![Ipv4Addr::new(10, 1, 1, 255)]);
        assert_eq!(probe.port, 9999);
    }
}
