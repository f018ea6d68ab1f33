//! We use this mocking module in unit tests to emulate a serial port with a PSU on the other end.

use crate::{
    codec::OperatingParameters,
    frame::{self, Command, FRAME_LEN, ResultCode},
};

/// Our mock type used to emulate a serial port.
///
/// Queued replies only become readable once a request has been flushed, one reply per flush,
/// the way the PSU answers each command. Bytes that are already on the line before a request
/// (noise, a late reply) are added with [`MockSerial::push_unsolicited`].
pub struct MockSerial {
    /// Every byte written to the mock serial port
    write_buffer: heapless::Vec<u8, 256>,
    /// Replies waiting for a request
    replies: heapless::Deque<heapless::Vec<u8, 32>, 16>,
    /// Bytes which have arrived and can be read
    read_buffer: heapless::Vec<u8, 256>,
    /// Current position in the read buffer
    read_position: usize,
    /// Largest chunk handed out per read() call, to exercise partial reads
    chunk_size: usize,
    /// Number of read() calls still to be interrupted
    interrupted_reads: usize,
    /// Number of flush() calls
    flush_count: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MockSerialError {
    /// Nothing has arrived to be read
    #[error("read timed out")]
    Timeout,
    /// The read was interrupted before any data arrived
    #[error("read interrupted")]
    Interrupted,
    /// Simulated buffer overflow
    #[error("mock buffer overflow")]
    BufferOverflow,
    /// Generic simulated error for testing
    #[error("simulated serial error")]
    SimulatedError,
}

impl embedded_io::Error for MockSerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockSerialError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockSerialError::Interrupted => embedded_io::ErrorKind::Interrupted,
            MockSerialError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockSerialError::SimulatedError => embedded_io::ErrorKind::Other,
        }
    }
}

impl embedded_io::ErrorType for MockSerial {
    type Error = MockSerialError;
}

impl embedded_io::Write for MockSerial {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }

        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockSerialError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockSerialError::SimulatedError);
        }
        self.flush_count += 1;

        if let Some(reply) = self.replies.pop_front() {
            self.push_unsolicited(&reply)?;
        }
        Ok(())
    }
}

impl embedded_io::Read for MockSerial {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockSerialError::SimulatedError);
        }

        if self.interrupted_reads > 0 {
            self.interrupted_reads -= 1;
            return Err(MockSerialError::Interrupted);
        }

        if self.read_position >= self.read_buffer.len() {
            return Err(MockSerialError::Timeout);
        }

        let available_bytes = self.read_buffer.len() - self.read_position;
        let bytes_to_read = buf.len().min(available_bytes).min(self.chunk_size);

        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl embedded_io::ReadReady for MockSerial {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(self.unread_len() > 0)
    }
}

impl MockSerial {
    /// Create a new MockSerial instance with empty buffers
    pub fn new() -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            replies: heapless::Deque::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            chunk_size: usize::MAX,
            interrupted_reads: 0,
            flush_count: 0,
            should_error_on_write: false,
            should_error_on_read: false,
        }
    }

    /// Create a MockSerial which will answer each request with the next of `responses`.
    pub fn with_responses(responses: &[&[u8]]) -> Self {
        let mut mock = Self::new();
        for response in responses {
            mock.queue_response(response).unwrap();
        }
        mock
    }

    /// Queue a reply, released by the next flush() without a reply of its own
    pub fn queue_response(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        let reply =
            heapless::Vec::from_slice(data).map_err(|_| MockSerialError::BufferOverflow)?;
        self.replies
            .push_back(reply)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Make `data` readable straight away, without waiting for a request
    pub fn push_unsolicited(&mut self, data: &[u8]) -> Result<(), MockSerialError> {
        if self.read_position == self.read_buffer.len() {
            self.read_buffer.clear();
            self.read_position = 0;
        }
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockSerialError::BufferOverflow)
    }

    /// Get a reference to the data that was written to this mock serial port
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// The `index`th frame written to this mock serial port
    pub fn written_frame(&self, index: usize) -> &[u8] {
        &self.write_buffer[index * FRAME_LEN..(index + 1) * FRAME_LEN]
    }

    /// Number of complete frames written so far
    pub fn written_frame_count(&self) -> usize {
        self.write_buffer.len() / FRAME_LEN
    }

    /// Number of bytes which have arrived but not been read
    pub fn unread_len(&self) -> usize {
        self.read_buffer.len() - self.read_position
    }

    /// Number of queued replies still waiting for a request
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// Hand out at most `size` bytes per read() call
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Fail the next `count` read() calls with [`MockSerialError::Interrupted`]
    pub fn interrupt_reads(&mut self, count: usize) {
        self.interrupted_reads = count;
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }
}

/// A response frame with the given command byte and payload.
pub fn response(address: u8, command: u8, payload: &[u8]) -> [u8; FRAME_LEN] {
    frame::encode(address, command, payload).unwrap()
}

/// A CHECK style acknowledgement carrying `result`.
pub fn check_response(address: u8, result: ResultCode) -> [u8; FRAME_LEN] {
    response(address, Command::Check.into(), &[result as u8])
}

/// A READ response reporting `params`.
pub fn read_response(address: u8, params: &OperatingParameters) -> [u8; FRAME_LEN] {
    let milli = |value: f32| (value * 1000.0).round() as u32;
    let centi = |value: f32| (value * 100.0).round() as u16;

    let mut payload = [0u8; 21];
    payload[0..2].copy_from_slice(&(milli(params.measure_current) as u16).to_le_bytes());
    payload[2..6].copy_from_slice(&milli(params.measure_voltage).to_le_bytes());
    payload[6..8].copy_from_slice(&centi(params.measure_power).to_le_bytes());
    payload[8..10].copy_from_slice(&(milli(params.max_current) as u16).to_le_bytes());
    payload[10..14].copy_from_slice(&milli(params.max_voltage).to_le_bytes());
    payload[14..16].copy_from_slice(&centi(params.max_power).to_le_bytes());
    payload[16..20].copy_from_slice(&milli(params.voltage_set).to_le_bytes());
    payload[20] = params.status_flags().into_bytes()[0];
    response(address, Command::Read.into(), &payload)
}

/// A READ_INFO response. Text fields shorter than their slot are zero padded.
pub fn info_response(address: u8, serial: &[u8], model: &[u8], version: u16) -> [u8; FRAME_LEN] {
    let mut payload = [0u8; 13];
    payload[..serial.len()].copy_from_slice(serial);
    payload[6..6 + model.len()].copy_from_slice(model);
    payload[11..13].copy_from_slice(&version.to_le_bytes());
    response(address, Command::ReadInfo.into(), &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, ReadReady, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockSerial::new();
        mock.write(b"Hello, ").unwrap();
        mock.write(b"World!").unwrap();
        assert_eq!(mock.written_data(), b"Hello, World!");
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockSerial::new();
        let large_data = [0u8; 300]; // Larger than 256 byte capacity

        let result = mock.write(&large_data);
        assert!(matches!(result, Err(MockSerialError::BufferOverflow)));
    }

    #[test]
    fn test_flush_is_counted() {
        let mut mock = MockSerial::new();
        mock.flush().unwrap();
        mock.flush().unwrap();
        assert_eq!(mock.flush_count(), 2);
    }

    #[test]
    fn test_read_in_chunks() {
        let mut mock = MockSerial::with_responses(&[b"Hello World"]);
        mock.set_chunk_size(5);
        mock.flush().unwrap();

        let mut buffer = [0u8; 20];
        assert_eq!(mock.read(&mut buffer).unwrap(), 5);
        assert_eq!(&buffer[..5], b"Hello");
        assert_eq!(mock.unread_len(), 6);
    }

    #[test]
    fn test_each_flush_releases_one_reply() {
        let mut mock = MockSerial::with_responses(&[b"first", b"second"]);
        assert_eq!(mock.pending_replies(), 2);
        assert!(!mock.read_ready().unwrap());

        let mut buffer = [0u8; 20];
        mock.flush().unwrap();
        assert!(mock.read_ready().unwrap());
        let count = mock.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..count], b"first");

        mock.flush().unwrap();
        let count = mock.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..count], b"second");
        assert_eq!(mock.pending_replies(), 0);
    }

    #[test]
    fn test_unsolicited_bytes_are_readable_at_once() {
        let mut mock = MockSerial::with_responses(&[b"reply"]);
        mock.push_unsolicited(&[0x00]).unwrap();
        assert!(mock.read_ready().unwrap());

        mock.flush().unwrap();
        let mut buffer = [0u8; 10];
        let count = mock.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..count], b"\0reply");
    }

    #[test]
    fn test_read_times_out_when_drained() {
        let mut mock = MockSerial::with_responses(&[b"Hi"]);
        mock.flush().unwrap();
        let mut buffer = [0u8; 10];

        assert!(mock.read(&mut buffer).is_ok());
        let err = mock.read(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), embedded_io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_interrupted_reads() {
        let mut mock = MockSerial::with_responses(&[b"Hi"]);
        mock.interrupt_reads(1);
        mock.flush().unwrap();
        let mut buffer = [0u8; 10];

        let err = mock.read(&mut buffer).unwrap_err();
        assert_eq!(err.kind(), embedded_io::ErrorKind::Interrupted);
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);
    }

    #[test]
    fn test_error_simulation() {
        let mut mock = MockSerial::with_responses(&[b"data"]);
        mock.set_write_error(true);
        mock.set_read_error(true);

        assert!(matches!(mock.write(b"test"), Err(MockSerialError::SimulatedError)));
        assert!(matches!(mock.flush(), Err(MockSerialError::SimulatedError)));
        assert_eq!(mock.written_data().len(), 0);

        let mut buffer = [0u8; 10];
        assert!(matches!(mock.read(&mut buffer), Err(MockSerialError::SimulatedError)));
        assert_eq!(
            MockSerialError::SimulatedError.kind(),
            embedded_io::ErrorKind::Other
        );
        assert_eq!(MockSerialError::SimulatedError.to_string(), "simulated serial error");
    }

    #[test]
    fn test_response_helpers_are_valid_frames() {
        let params = OperatingParameters {
            measure_current: 1.5,
            voltage_set: 12.0,
            output_enabled: true,
            ..Default::default()
        };
        let read = frame::decode(&read_response(3, &params)).unwrap();
        assert_eq!(read.address(), 3);
        assert_eq!(read.command(), 0x81);
        assert_eq!(&read.as_bytes()[3..5], &1500u16.to_le_bytes());
        assert_eq!(read.as_bytes()[23], 0x01);

        let check = frame::decode(&check_response(0, ResultCode::Error)).unwrap();
        assert_eq!(check.command(), 0x12);
        assert_eq!(check.result(), 0x90);

        let info = frame::decode(&info_response(0, b"A12345", b"3645A", 101)).unwrap();
        assert_eq!(&info.as_bytes()[3..9], b"A12345");
        assert_eq!(&info.as_bytes()[9..14], b"3645A");
        assert_eq!(&info.as_bytes()[14..16], &101u16.to_le_bytes());
    }
}
