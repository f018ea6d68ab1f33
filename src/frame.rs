//! Encoding and decoding of the fixed 26 byte 364x frame.
//!
//! Every exchange, in both directions, uses the same frame shape:
//!
//! ```text
//! 0xAA <address> <command> <payload: 22 bytes> <checksum>
//! ```
//!
//! The checksum is the sum of the preceding 25 bytes (sync byte included), modulo 256.

use core::fmt;

use strum_macros::EnumIter;

use crate::error::CodecError;

/// Sync byte leading every frame.
pub const SYNC_BYTE: u8 = 0xAA;
/// Total length of a frame on the wire.
pub const FRAME_LEN: usize = 26;
/// Length of the command specific payload.
pub const PAYLOAD_LEN: usize = 22;
/// Offset of the first payload byte.
pub const PAYLOAD_OFFSET: usize = 3;
/// Offset of the trailing checksum byte.
pub const CHECKSUM_OFFSET: usize = FRAME_LEN - 1;

/// A payload of at most [`PAYLOAD_LEN`] bytes.
pub type Payload = heapless::Vec<u8, PAYLOAD_LEN>;

/// Command IDs understood by the PSU.
#[derive(Debug, EnumIter, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum Command {
    /// Acknowledgement. Only ever seen in responses, with a [`ResultCode`] in byte 3.
    Check = 0x12,
    /// Write the operating parameters.
    Set = 0x80,
    /// Read the operating parameters and live measurements.
    Read = 0x81,
    /// Set the output and remote control state.
    ControlState = 0x82,
    /// Read serial number, model and firmware version.
    ReadInfo = 0x8C,
}

impl From<Command> for u8 {
    fn from(value: Command) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = ();
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x12 => Ok(Command::Check),
            0x80 => Ok(Command::Set),
            0x81 => Ok(Command::Read),
            0x82 => Ok(Command::ControlState),
            0x8C => Ok(Command::ReadInfo),
            _ => Err(()),
        }
    }
}

/// Result codes carried in byte 3 of a [`Command::Check`] response.
#[derive(Debug, EnumIter, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0x80,
    Error = 0x90,
}

impl TryFrom<u8> for ResultCode {
    type Error = ();
    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            t if t == ResultCode::Ok as u8 => Ok(ResultCode::Ok),
            t if t == ResultCode::Error as u8 => Ok(ResultCode::Error),
            _ => Err(()),
        }
    }
}

/// A checksum-verified frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    raw: [u8; FRAME_LEN],
}

impl Frame {
    /// Device address, byte 1.
    pub fn address(&self) -> u8 {
        self.raw[1]
    }

    /// Command ID in a request, echoed command or result code in a response. Byte 2.
    pub fn command(&self) -> u8 {
        self.raw[2]
    }

    /// Result or status byte, byte 3. Same as the first payload byte.
    pub fn result(&self) -> u8 {
        self.raw[PAYLOAD_OFFSET]
    }

    /// The 22 payload bytes, bytes 3 to 24.
    pub fn payload(&self) -> &[u8] {
        &self.raw[PAYLOAD_OFFSET..CHECKSUM_OFFSET]
    }

    pub fn checksum(&self) -> u8 {
        self.raw[CHECKSUM_OFFSET]
    }

    /// The whole frame as it appeared on the wire.
    ///
    /// Parameter offsets in [`crate::codec`] are relative to this.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.raw
    }
}

/// Additive checksum of `bytes`, modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Build a wire frame for `command` addressed to `address`.
///
/// Payloads shorter than 22 bytes are zero padded.
pub fn encode(
    address: u8,
    command: impl Into<u8>,
    payload: &[u8],
) -> Result<[u8; FRAME_LEN], CodecError> {
    if payload.len() > PAYLOAD_LEN {
        return Err(CodecError::PayloadTooLarge { len: payload.len() });
    }

    let mut frame = [0u8; FRAME_LEN];
    frame[0] = SYNC_BYTE;
    frame[1] = address;
    frame[2] = command.into();
    frame[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload.len()].copy_from_slice(payload);
    frame[CHECKSUM_OFFSET] = checksum(&frame[..CHECKSUM_OFFSET]);
    Ok(frame)
}

/// Validate and wrap a received frame.
pub fn decode(bytes: &[u8]) -> Result<Frame, CodecError> {
    let raw: [u8; FRAME_LEN] = bytes
        .try_into()
        .map_err(|_| CodecError::FrameLength { len: bytes.len() })?;

    let expected = checksum(&raw[..CHECKSUM_OFFSET]);
    let actual = raw[CHECKSUM_OFFSET];
    if expected != actual {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }

    Ok(Frame { raw })
}

/// Build a payload from discrete integer values, each of which must fit in a byte.
pub fn payload_from_values(values: &[i32]) -> Result<Payload, CodecError> {
    if values.len() > PAYLOAD_LEN {
        return Err(CodecError::PayloadTooLarge { len: values.len() });
    }

    let mut payload = Payload::new();
    for (index, &value) in values.iter().enumerate() {
        let byte = u8::try_from(value)
            .map_err(|_| CodecError::InvalidParameterEncoding { index, value })?;
        // Length was checked above.
        let _ = payload.push(byte);
    }
    Ok(payload)
}

/// Renders bytes as space separated hex, for logging frames without allocating.
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}
