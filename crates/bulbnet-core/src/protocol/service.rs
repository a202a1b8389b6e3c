//! Service discovery messages.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Message type numbers used by discovery.
pub mod message_type {
    /// Probe: ask devices for their service endpoint.
    pub const GET_SERVICE: u16 = 2;
    /// Reply to a probe.
    pub const STATE_SERVICE: u16 = 3;
}

/// Well-known service number for the UDP control service.
pub const SERVICE_UDP: u8 = 1;

/// Payload of a service reply: which service and on which port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateService {
    pub service: u8,
    pub port: u32,
}

impl StateService {
    pub const LEN: usize = 5;

    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < Self::LEN {
            return Err(ProtocolError::PayloadTooShort {
                message_type: message_type::STATE_SERVICE,
                expected: Self::LEN,
                actual: payload.len(),
            });
        }

        let mut buf = payload;
        let service = buf.get_u8();
        let port = buf.get_u32_le();
        Ok(Self { service, port })
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::LEN);
        buf.put_u8(self.service);
        buf.put_u32_le(self.port);
        buf.freeze()
    }
}
