//! In-memory sender for tests.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Mutex;

use bytes::Bytes;

use super::FrameSender;
use crate::protocol::Frame;

/// Records every send; fails sends to the configured hosts.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(SocketAddr, Bytes)>>,
    failing: Vec<IpAddr>,
}

impl RecordingSender {
    pub fn failing(hosts: impl IntoIterator<Item = IpAddr>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: hosts.into_iter().collect(),
        }
    }

    pub fn destinations(&self) -> Vec<SocketAddr> {
        self.sent.lock().unwrap().iter().map(|(dest, _)| *dest).collect()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, bytes)| Frame::decode(bytes).unwrap())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl FrameSender for RecordingSender {
    async fn send_frame(&self, dest: SocketAddr, frame: Bytes) -> io::Result<()> {
        self.sent.lock().unwrap().push((dest, frame));
        if self.failing.contains(&dest.ip()) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("send to {} denied", dest),
            ));
        }
        Ok(())
    }
}
