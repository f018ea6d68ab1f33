//! Our error types for the 364x PSUs.

use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Custom error type for 364x PSU communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    #[error("Serial communication error")]
    SerialError(I),
    #[error("Communication timeout")]
    Timeout,
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(ResponseFault),
    #[error("Frame codec error: {0}")]
    Codec(CodecError),
    #[error("Invalid device address {0}, must be 0-254")]
    InvalidAddress(u8),
}

impl<I: embedded_io::Error> From<CodecError> for Error<I> {
    fn from(err: CodecError) -> Self {
        Error::Codec(err)
    }
}

/// Why a response frame could not be trusted.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFault {
    #[error("short frame ({received} of 26 bytes)")]
    ShortFrame { received: usize },
    #[error("bad checksum (expected {expected:#04X}, got {actual:#04X})")]
    BadChecksum { expected: u8, actual: u8 },
}

/// Errors raised by the pure frame and parameter codecs.
///
/// These never involve the serial port, so they carry no I/O error type.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CodecError {
    #[error("Payload of {len} bytes exceeds the 22 byte frame payload")]
    PayloadTooLarge { len: usize },
    #[error("Payload value {value} at index {index} is outside 0-255")]
    InvalidParameterEncoding { index: usize, value: i32 },
    #[error("Frame must be exactly 26 bytes, got {len}")]
    FrameLength { len: usize },
    #[error("Checksum mismatch (expected {expected:#04X}, got {actual:#04X})")]
    ChecksumMismatch { expected: u8, actual: u8 },
    #[error("Value {value} cannot be represented in its fixed-point field")]
    ValueOutOfRange { value: f32 },
}
