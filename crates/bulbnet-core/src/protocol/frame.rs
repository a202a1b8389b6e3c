//! Frame header codec.
//!
//! Every datagram starts with a fixed 36-byte little-endian header:
//!
//! | offset | size | field                                         |
//! |--------|------|-----------------------------------------------|
//! | 0      | 2    | total frame size                              |
//! | 2      | 2    | protocol (12 bits), addressable, tagged, origin |
//! | 4      | 4    | source (correlation id)                       |
//! | 8      | 8    | target (6-byte device address, zero padded)   |
//! | 16     | 6    | reserved                                      |
//! | 22     | 1    | res_required, ack_required                    |
//! | 23     | 1    | sequence                                      |
//! | 24     | 8    | reserved                                      |
//! | 32     | 2    | message type                                  |
//! | 34     | 2    | reserved                                      |

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

use super::service::{message_type, StateService};

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = 36;

/// Protocol number carried in every frame.
pub const PROTOCOL_NUMBER: u16 = 1024;

const PROTOCOL_MASK: u16 = 0x0fff;
const ADDRESSABLE: u16 = 1 << 12;
const TAGGED: u16 = 1 << 13;

const RES_REQUIRED: u8 = 1 << 0;
const ACK_REQUIRED: u8 = 1 << 1;

/// Decoded frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Set when the frame is addressed to all devices (target is ignored).
    pub tagged: bool,
    /// Correlation id echoed back by devices.
    pub source: u32,
    /// Device address, first six bytes significant.
    pub target: [u8; 8],
    pub ack_required: bool,
    pub res_required: bool,
    pub sequence: u8,
    pub message_type: u16,
}

/// A header plus its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    /// Broadcast probe asking every device to report its service endpoint.
    pub fn get_service(source: u32) -> Self {
        Self {
            header: FrameHeader {
                tagged: true,
                source,
                target: [0u8; 8],
                ack_required: false,
                res_required: false,
                sequence: 0,
                message_type: message_type::GET_SERVICE,
            },
            payload: Bytes::new(),
        }
    }

    /// Service announcement as a device sends it in reply to a probe.
    pub fn state_service(source: u32, address: [u8; 6], service: StateService) -> Self {
        let mut target = [0u8; 8];
        target[..6].copy_from_slice(&address);

        Self {
            header: FrameHeader {
                tagged: false,
                source,
                target,
                ack_required: false,
                res_required: false,
                sequence: 0,
                message_type: message_type::STATE_SERVICE,
            },
            payload: service.encode(),
        }
    }

    pub fn source(&self) -> u32 {
        self.header.source
    }

    pub fn message_type(&self) -> u16 {
        self.header.message_type
    }

    /// Serialize header and payload into one datagram.
    pub fn encode(&self) -> Bytes {
        let size = HEADER_LEN + self.payload.len();
        let mut buf = BytesMut::with_capacity(size);

        let mut protocol = PROTOCOL_NUMBER | ADDRESSABLE;
        if self.header.tagged {
            protocol |= TAGGED;
        }

        let mut flags = 0u8;
        if self.header.res_required {
            flags |= RES_REQUIRED;
        }
        if self.header.ack_required {
            flags |= ACK_REQUIRED;
        }

        buf.put_u16_le(size as u16);
        buf.put_u16_le(protocol);
        buf.put_u32_le(self.header.source);
        buf.put_slice(&self.header.target);
        buf.put_bytes(0, 6);
        buf.put_u8(flags);
        buf.put_u8(self.header.sequence);
        buf.put_u64_le(0);
        buf.put_u16_le(self.header.message_type);
        buf.put_u16_le(0);
        buf.put_slice(&self.payload);

        buf.freeze()
    }

    /// Parse a received datagram.
    ///
    /// Bytes beyond the size declared in the header are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < HEADER_LEN {
            return Err(ProtocolError::TooShort {
                len: data.len(),
                min: HEADER_LEN,
            });
        }

        let mut buf = data;
        let declared = buf.get_u16_le() as usize;
        if declared < HEADER_LEN || declared > data.len() {
            return Err(ProtocolError::SizeMismatch {
                declared,
                actual: data.len(),
            });
        }

        let protocol = buf.get_u16_le();
        if protocol & PROTOCOL_MASK != PROTOCOL_NUMBER {
            return Err(ProtocolError::UnsupportedProtocol(protocol & PROTOCOL_MASK));
        }

        let source = buf.get_u32_le();
        let mut target = [0u8; 8];
        buf.copy_to_slice(&mut target);
        buf.advance(6);
        let flags = buf.get_u8();
        let sequence = buf.get_u8();
        buf.advance(8);
        let message_type = buf.get_u16_le();
        buf.advance(2);

        Ok(Self {
            header: FrameHeader {
                tagged: protocol & TAGGED != 0,
                source,
                target,
                ack_required: flags & ACK_REQUIRED != 0,
                res_required: flags & RES_REQUIRED != 0,
                sequence,
                message_type,
            },
            payload: Bytes::copy_from_slice(&data[HEADER_LEN..declared]),
        })
    }
}
