//! UDP broadcast transport.
//!
//! One socket both sends probes and receives replies, so devices answer to
//! the port the probe came from.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use super::FrameSender;
use crate::discovery::ResponseCorrelator;
use crate::protocol::{message_type, Frame};

/// Largest datagram we expect from a device.
const RECEIVE_BUFFER_SIZE: usize = 2048;

/// Pause after a failed receive so a persistent socket error cannot spin the loop.
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Create a broadcast-capable UDP socket bound to all interfaces.
pub fn create_broadcast_socket(port: u16) -> Result<std::net::UdpSocket, io::Error> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// UDP transport for discovery frames.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    send_timeout: Duration,
}

impl UdpTransport {
    /// Bind the transport socket. Port 0 picks an ephemeral port.
    pub async fn bind(port: u16, send_timeout: Duration) -> Result<Self, io::Error> {
        let std_socket = create_broadcast_socket(port)?;
        let socket = UdpSocket::from_std(std_socket)?;
        tracing::info!(local = %socket.local_addr()?, "discovery transport bound");

        Ok(Self {
            socket,
            send_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive replies forever, handing service replies to `correlator`.
    ///
    /// Receive errors and undecodable datagrams are logged and skipped.
    pub async fn run_receiver(&self, correlator: ResponseCorrelator) {
        let mut buf = vec![0u8; RECEIVE_BUFFER_SIZE];

        loop {
            let (len, addr) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    pause_after_receive_error(&e).await;
                    continue;
                }
            };

            let frame = match Frame::decode(&buf[..len]) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::trace!(from = %addr, error = %e, "ignoring undecodable datagram");
                    continue;
                }
            };

            if frame.message_type() != message_type::STATE_SERVICE {
                tracing::trace!(
                    from = %addr,
                    message_type = frame.message_type(),
                    "ignoring non-discovery message"
                );
                continue;
            }

            correlator
                .on_inbound_message(addr.ip(), addr.port(), &frame)
                .await;
        }
    }
}

async fn pause_after_receive_error(error: &io::Error) {
    tracing::warn!(error = %error, "UDP receive error");
    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
}

impl FrameSender for UdpTransport {
    async fn send_frame(&self, dest: SocketAddr, frame: Bytes) -> io::Result<()> {
        let sent = timeout(self.send_timeout, self.socket.send_to(&frame, dest))
            .await
            .map_err(|_| {
                io::Error::new(io::ErrorKind::TimedOut, format!("send to {} timed out", dest))
            })??;

        if sent != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short send to {}: {} of {} bytes", dest, sent, frame.len()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{DeviceRegistry, SessionIdAllocator, SessionStart, SessionTracker};
    use crate::protocol::StateService;
    use crate::types::DeviceIdentity;
    use std::sync::Arc;

    const ADDRESS: [u8; 6] = [0xd0, 0x73, 0xd5, 0x10, 0x20, 0x30];

    #[tokio::test(start_paused = true)]
    async fn test_receive_error_backs_off() {
        let started = tokio::time::Instant::now();

        pause_after_receive_error(&io::Error::new(io::ErrorKind::ConnectionReset, "reset")).await;

        assert!(started.elapsed() >= RECEIVE_ERROR_BACKOFF);
    }

    #[tokio::test]
    async fn test_probe_and_reply_over_loopback() {
        let transport = Arc::new(UdpTransport::bind(0, Duration::from_secs(1)).await.unwrap());
        let transport_port = transport.local_addr().unwrap().port();

        let registry = Arc::new(DeviceRegistry::new());
        let sessions = Arc::new(SessionTracker::new());
        let allocator = SessionIdAllocator::new();
        let session = match sessions.begin(&allocator) {
            SessionStart::Started { id, .. } => id,
            SessionStart::AlreadyRunning { id } => id,
        };

        let correlator = ResponseCorrelator::new(registry.clone(), sessions.clone());
        let receiver = transport.clone();
        let receive_task = tokio::spawn(async move { receiver.run_receiver(correlator).await });

        // A fake device on loopback answering probes.
        let device = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let device_addr = device.local_addr().unwrap();

        transport
            .send_frame(device_addr, Frame::get_service(session).encode())
            .await
            .unwrap();

        let mut buf = [0u8; 128];
        let (len, _) = timeout(Duration::from_secs(2), device.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let probe = Frame::decode(&buf[..len]).unwrap();
        assert_eq!(probe.message_type(), message_type::GET_SERVICE);

        // Noise first; must be ignored.
        device
            .send_to(b"garbage", ("127.0.0.1", transport_port))
            .await
            .unwrap();

        let reply = Frame::state_service(
            probe.source(),
            ADDRESS,
            StateService {
                service: 1,
                port: 56700,
            },
        );
        device
            .send_to(&reply.encode(), ("127.0.0.1", transport_port))
            .await
            .unwrap();

        let identity = DeviceIdentity::new(ADDRESS);
        let record = timeout(Duration::from_secs(2), async {
            loop {
                if let Some(record) = registry.get(&identity).await {
                    return record;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(record.host(), "127.0.0.1");
        assert_eq!(record.port(), 56700);

        receive_task.abort();
    }
}
