//! Frame codec.
//!
//! Outbound: `START | OPCODE(2) | PAYLOAD(4) | CRC`
//! Inbound:  `START | OPCODE(2) | PAYLOAD(12) | CRC`
//!
//! The CRC covers every byte before it. Resynchronising after a bad frame is
//! the reader loop's job; this module only accepts or rejects.

use crate::constants::{COMMAND_FRAME_SIZE, COMMAND_PAYLOAD_SIZE, INBOUND_FRAME_SIZE, INBOUND_PAYLOAD_SIZE, START_BYTE};
use crate::crc::crc8;
use crate::error::LineError;
use crate::opcode::{Command, Inbound};
use bytes::{BufMut, Bytes, BytesMut};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Build the 8-byte frame for `command`.
pub fn encode_command(command: Command, payload: [u8; COMMAND_PAYLOAD_SIZE]) -> Bytes {
    let mut frame = BytesMut::with_capacity(COMMAND_FRAME_SIZE);
    frame.put_u8(START_BYTE);
    frame.put_u16(command.into());
    frame.put_slice(&payload);
    let crc = crc8(&frame);
    frame.put_u8(crc);
    frame.freeze()
}

/// Wire layout of a device-to-host frame
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct InboundFrameRaw {
    pub start: u8,
    pub opcode: [u8; 2],
    pub payload: [u8; INBOUND_PAYLOAD_SIZE],
    pub crc: u8,
}

/// A checksum-verified inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundFrame {
    pub opcode: [u8; 2],
    pub payload: [u8; INBOUND_PAYLOAD_SIZE],
}

impl InboundFrame {
    pub fn kind(&self) -> Inbound {
        Inbound::from(self.opcode)
    }
}

impl TryFrom<&[u8]> for InboundFrame {
    type Error = LineError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let raw = InboundFrameRaw::ref_from_bytes(bytes).map_err(|_| LineError::InvalidLength {
            expected: INBOUND_FRAME_SIZE,
            actual: bytes.len(),
        })?;

        let expected = crc8(&bytes[..INBOUND_FRAME_SIZE - 1]);
        if raw.crc != expected {
            return Err(LineError::ChecksumMismatch {
                expected,
                actual: raw.crc,
            });
        }

        Ok(InboundFrame {
            opcode: raw.opcode,
            payload: raw.payload,
        })
    }
}

/// Validate and split a 16-byte inbound frame.
pub fn try_parse_inbound(bytes: &[u8]) -> Result<InboundFrame, LineError> {
    InboundFrame::try_from(bytes)
}
