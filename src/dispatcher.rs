//! A single request/response exchange with the PSU.

use embedded_io::Error as _;

use crate::{
    error::{CodecError, Error, ResponseFault, Result},
    frame::{self, Command, FRAME_LEN, Frame, HexBytes, ResultCode},
    session::Session,
};

/// How the PSU answered a well formed request.
///
/// A rejection is a normal protocol outcome, not an error. Transport failures and
/// malformed responses are reported through [`Error`] instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome<T> {
    /// The PSU acknowledged the command.
    Accepted(T),
    /// The PSU answered with neither a positive CHECK nor an echo of our command.
    Rejected {
        /// Byte 2 of the response.
        code: u8,
        /// Byte 3 of the response.
        result: u8,
    },
}

impl<T> Outcome<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted(_))
    }

    /// Convert into an [`Option`], discarding the rejection details.
    pub fn accepted(self) -> Option<T> {
        match self {
            Outcome::Accepted(value) => Some(value),
            Outcome::Rejected { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Accepted(value) => Outcome::Accepted(f(value)),
            Outcome::Rejected { code, result } => Outcome::Rejected { code, result },
        }
    }
}

/// Owns the serial interface and runs one exchange at a time.
///
/// Every exchange discards whatever is already waiting on the line, writes one frame and then
/// blocks until 26 bytes arrive or the interface reports [`embedded_io::ErrorKind::TimedOut`].
pub struct CommandDispatcher<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady> {
    interface: S,
}

impl<S: embedded_io::Read + embedded_io::Write + embedded_io::ReadReady> CommandDispatcher<S> {
    pub fn new(interface: S) -> Self {
        Self { interface }
    }

    pub fn interface(&self) -> &S {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut S {
        &mut self.interface
    }

    pub fn into_interface(self) -> S {
        self.interface
    }

    /// Send `command` to the PSU addressed by `session` and classify its response.
    pub fn send(
        &mut self,
        session: &Session,
        command: Command,
        payload: &[u8],
    ) -> Result<Outcome<Frame>, S::Error> {
        let request = frame::encode(session.address(), command, payload)?;
        self.discard_stale_input()?;
        log::trace!(
            "send address={} command={:?}: {}",
            session.address(),
            command,
            HexBytes(&request)
        );

        self.interface
            .write_all(&request)
            .map_err(Error::SerialError)?;
        self.interface.flush().map_err(Error::SerialError)?;

        let raw = self.read_frame()?;
        log::trace!("recv: {}", HexBytes(&raw));

        let response = frame::decode(&raw).map_err(|err| match err {
            CodecError::ChecksumMismatch { expected, actual } => {
                Error::UnexpectedResponse(ResponseFault::BadChecksum { expected, actual })
            }
            other => Error::Codec(other),
        })?;

        Ok(classify(command, response))
    }

    /// Drop bytes received outside an exchange, such as line noise or the tail of a late reply.
    fn discard_stale_input(&mut self) -> Result<(), S::Error> {
        let mut scratch = [0u8; FRAME_LEN];
        let mut discarded = 0;

        while self.interface.read_ready().map_err(Error::SerialError)? {
            match self.interface.read(&mut scratch) {
                Ok(0) => break,
                Ok(bytes_read) => {
                    log::trace!("stale: {}", HexBytes(&scratch[..bytes_read]));
                    discarded += bytes_read;
                }
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::Interrupted) => continue,
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::TimedOut) => break,
                Err(e) => return Err(Error::SerialError(e)),
            }
        }

        if discarded > 0 {
            log::debug!("discarded {} stale bytes", discarded);
        }
        Ok(())
    }

    /// Read exactly one frame, accumulating partial reads.
    fn read_frame(&mut self) -> Result<[u8; FRAME_LEN], S::Error> {
        let mut buf = [0u8; FRAME_LEN];
        let mut received = 0;

        while received < FRAME_LEN {
            match self.interface.read(&mut buf[received..]) {
                Ok(0) => break,
                Ok(bytes_read) => received += bytes_read,
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::Interrupted) => continue,
                Err(e) if matches!(e.kind(), embedded_io::ErrorKind::TimedOut) => break,
                Err(e) => return Err(Error::SerialError(e)),
            }
        }

        match received {
            0 => {
                log::debug!("no response before timeout");
                Err(Error::Timeout)
            }
            FRAME_LEN => Ok(buf),
            received => {
                log::debug!("short frame: {}", HexBytes(&buf[..received]));
                Err(Error::UnexpectedResponse(ResponseFault::ShortFrame {
                    received,
                }))
            }
        }
    }
}

/// A response is accepted if it is a positive CHECK, or echoes the command we sent.
fn classify(sent: Command, response: Frame) -> Outcome<Frame> {
    let code = response.command();
    let result = response.result();

    let positive_check = code == Command::Check as u8 && result == ResultCode::Ok as u8;
    if positive_check || code == sent as u8 {
        log::debug!("{:?} accepted", sent);
        Outcome::Accepted(response)
    } else {
        match ResultCode::try_from(result) {
            Ok(ResultCode::Error) if code == Command::Check as u8 => {
                log::debug!("{:?} rejected, PSU reported an error", sent)
            }
            _ => log::debug!(
                "{:?} rejected, code={:#04X} result={:#04X}",
                sent,
                code,
                result
            ),
        }
        Outcome::Rejected { code, result }
    }
}
