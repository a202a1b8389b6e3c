//! Transport layer for discovery frames.
//!
//! The discovery core only needs to push an encoded frame at an address;
//! receiving is driven by the transport, which hands decoded frames to the
//! correlator.

use std::future::Future;
use std::io;
use std::net::SocketAddr;

use bytes::Bytes;

pub mod udp;

#[cfg(test)]
pub(crate) mod mock;

pub use udp::UdpTransport;

/// Sends encoded frames to a single destination.
pub trait FrameSender: Send + Sync + 'static {
    /// Fire one datagram at `dest`. May fail or time out per destination.
    fn send_frame(
        &self,
        dest: SocketAddr,
        frame: Bytes,
    ) -> impl Future<Output = io::Result<()>> + Send;
}
