use std::io::ErrorKind;
use std::time::Duration;

use serde::Serialize;
use spine_transport::Transport;
use tracing::{debug, warn};

use crate::codec::{Frame, FrameConfig, FrameHeader};
use crate::crc;
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::protocol::{Direction, PayloadType, CRC_LEN, HEADER_LEN, MAX_FRAME_LEN};
use crate::sync::sync;

/// Result of one [`FrameReader::read_frame`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete frame with a matching checksum.
    Frame(Frame),
    /// A complete frame failed its checksum and was dropped.
    Discarded {
        payload_type: PayloadType,
        /// Best-effort guess at how many bytes were lost. Diagnostic only.
        dropped_estimate: usize,
    },
    /// The line stayed silent for a whole poll interval.
    TimedOut,
    /// The scan budget ran out mid-stream. Assembly resumes on the next call.
    Pending,
}

/// Running counters for a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    pub frames: u64,
    pub crc_errors: u64,
    pub poll_timeouts: u64,
    pub bytes_read: u64,
}

/// Assembles validated frames from a non-blocking [`Transport`].
///
/// Header bytes are read one at a time and fed to the synchronizer; once a
/// header is confirmed the payload and checksum are read in bulk. Partial
/// frames survive across calls and are never exposed.
pub struct FrameReader<T> {
    inner: T,
    direction: Direction,
    buf: [u8; MAX_FRAME_LEN],
    index: usize,
    config: FrameConfig,
    stats: ReaderStats,
}

impl<T: Transport> FrameReader<T> {
    /// Create a reader for frames travelling in `direction`.
    pub fn new(inner: T, direction: Direction) -> Self {
        Self::with_config(inner, direction, FrameConfig::default())
    }

    /// Create a reader with explicit configuration.
    pub fn with_config(inner: T, direction: Direction, config: FrameConfig) -> Self {
        Self {
            inner,
            direction,
            buf: [0; MAX_FRAME_LEN],
            index: 0,
            config,
            stats: ReaderStats::default(),
        }
    }

    /// Read until a frame completes, the line goes quiet for one poll
    /// interval, or the scan budget is spent.
    pub fn read_frame(&mut self) -> Result<ReadOutcome> {
        let timeout = self.config.poll_timeout;
        self.read_frame_within(timeout)
    }

    /// Like [`read_frame`](Self::read_frame) with a one-off poll timeout.
    pub fn read_frame_within(&mut self, poll_timeout: Duration) -> Result<ReadOutcome> {
        let mut scanned = 0usize;
        let mut poll_ready = false;

        loop {
            let target = if self.index < HEADER_LEN {
                self.index + 1
            } else {
                let target = self.pending_frame_len();
                if self.index == target {
                    return Ok(self.complete_frame());
                }
                target
            };

            if scanned >= self.config.scan_budget {
                debug!(scanned, index = self.index, "scan budget exhausted");
                return Ok(ReadOutcome::Pending);
            }

            match self.inner.read(&mut self.buf[self.index..target]) {
                Ok(0) if poll_ready => return Err(FrameError::ConnectionClosed),
                Ok(0) => {}
                Ok(n) => {
                    poll_ready = false;
                    scanned += n;
                    self.stats.bytes_read += n as u64;
                    self.index = if self.index < HEADER_LEN {
                        sync(&self.buf, self.index, self.direction)
                    } else {
                        self.index + n
                    };
                    continue;
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => {}
                Err(err) => return Err(FrameError::Io(err)),
            }

            if !self.inner.poll_readable(poll_timeout)? {
                self.stats.poll_timeouts += 1;
                return Ok(ReadOutcome::TimedOut);
            }
            poll_ready = true;
        }
    }

    /// Total length of the frame whose header is confirmed in `buf`.
    fn pending_frame_len(&self) -> usize {
        let payload_len = u16::from_le_bytes([self.buf[6], self.buf[7]]) as usize;
        (HEADER_LEN + payload_len + CRC_LEN).min(MAX_FRAME_LEN)
    }

    fn complete_frame(&mut self) -> ReadOutcome {
        let frame_len = self.index;
        self.index = 0;

        let mut raw = [0u8; HEADER_LEN];
        raw.copy_from_slice(&self.buf[..HEADER_LEN]);
        let header = match FrameHeader::parse(&raw, self.direction) {
            Ok(header) => header,
            Err(err) => {
                // The synchronizer only confirms table-valid headers.
                warn!(error = %err, "confirmed header failed to parse");
                return ReadOutcome::Pending;
            }
        };

        let payload_end = frame_len - CRC_LEN;
        let payload = &self.buf[HEADER_LEN..payload_end];
        let mut crc_bytes = [0u8; CRC_LEN];
        crc_bytes.copy_from_slice(&self.buf[payload_end..frame_len]);
        let checksum = u32::from_le_bytes(crc_bytes);

        if !crc::validate(payload, checksum) {
            self.stats.crc_errors += 1;
            let dropped_estimate = crc::estimate_dropped_bytes(&self.buf[HEADER_LEN..frame_len]);
            warn!(
                payload_type = %header.payload_type,
                dropped_estimate,
                "checksum mismatch, frame discarded"
            );
            return ReadOutcome::Discarded {
                payload_type: header.payload_type,
                dropped_estimate,
            };
        }

        match Message::decode(header.payload_type, self.direction, payload) {
            Ok(message) => {
                self.stats.frames += 1;
                debug!(payload_type = %header.payload_type, len = frame_len, "frame received");
                ReadOutcome::Frame(Frame {
                    header,
                    message,
                    checksum,
                })
            }
            Err(err) => {
                warn!(error = %err, "validated payload failed to decode");
                ReadOutcome::Pending
            }
        }
    }

    /// Direction of the frames this reader accepts.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of bytes of a partial frame currently held.
    pub fn buffered(&self) -> usize {
        self.index
    }

    /// Counters since construction.
    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
