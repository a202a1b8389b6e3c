//! Protocol layer for device communication.
//!
//! Encodes discovery probes and decodes the frames devices send back.

pub mod frame;
pub mod service;

pub use frame::{Frame, FrameHeader, HEADER_LEN, PROTOCOL_NUMBER};
pub use service::{message_type, StateService};
