use std::io::{ErrorKind, Write};

use tracing::trace;

use crate::codec::FrameHeader;
use crate::crc;
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::protocol::{Direction, PayloadType, MAX_PAYLOAD_LEN};

/// Writes frames to any `Write` stream.
///
/// Each frame goes out as three writes in fixed order: header, payload,
/// checksum. Nothing is written unless the payload length matches the table.
pub struct FrameWriter<T> {
    inner: T,
    direction: Direction,
    payload: [u8; MAX_PAYLOAD_LEN],
    frames_sent: u64,
}

impl<T: Write> FrameWriter<T> {
    /// Create a writer for frames travelling in `direction`.
    pub fn new(inner: T, direction: Direction) -> Self {
        Self {
            inner,
            direction,
            payload: [0; MAX_PAYLOAD_LEN],
            frames_sent: 0,
        }
    }

    /// Encode and send a typed message.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let len = message.encode_payload(self.direction, &mut self.payload)?;
        let header = FrameHeader::new(self.direction, message.payload_type(), len)?;
        let checksum = crc::checksum(&self.payload[..len]);

        write_all(&mut self.inner, &header.to_bytes())?;
        write_all(&mut self.inner, &self.payload[..len])?;
        write_all(&mut self.inner, &checksum.to_le_bytes())?;
        self.finish(header.payload_type)
    }

    /// Send raw payload bytes under `payload_type`.
    ///
    /// Fails with `LengthMismatch` or `InvalidForDirection` before writing
    /// anything when `payload` disagrees with the length table.
    pub fn write_frame(&mut self, payload_type: PayloadType, payload: &[u8]) -> Result<()> {
        let header = FrameHeader::new(self.direction, payload_type, payload.len())?;

        write_all(&mut self.inner, &header.to_bytes())?;
        write_all(&mut self.inner, payload)?;
        write_all(&mut self.inner, &crc::checksum(payload).to_le_bytes())?;
        self.finish(payload_type)
    }

    fn finish(&mut self, payload_type: PayloadType) -> Result<()> {
        self.flush()?;
        self.frames_sent += 1;
        trace!(%payload_type, direction = %self.direction, "frame sent");
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Direction of the frames this writer produces.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Frames written since construction.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

fn write_all<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}
