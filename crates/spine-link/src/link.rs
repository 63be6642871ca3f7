use std::io::Write;
use std::time::Duration;

use spine_frame::{Direction, FrameReader, FrameWriter, Message, ReadOutcome, ReaderStats};
use spine_transport::Transport;
#[cfg(unix)]
use spine_transport::{SerialConfig, SerialPort};

use crate::config::LinkConfig;
use crate::error::Result;

/// The head end of the spine: a frame reader for body traffic and a frame
/// writer for head traffic.
pub struct SpineLink<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
}

#[cfg(unix)]
impl SpineLink<SerialPort, SerialPort> {
    /// Open the serial device and split it into read and write halves.
    pub fn open(serial: &SerialConfig, config: &LinkConfig) -> Result<Self> {
        let port = SerialPort::open(serial)?;
        let read_half = port.try_clone()?;
        Ok(Self::new(read_half, port, config))
    }
}

impl<R: Transport, W: Write> SpineLink<R, W> {
    /// Build a head-side link from separate read and write halves.
    pub fn new(read_half: R, write_half: W, config: &LinkConfig) -> Self {
        Self {
            reader: FrameReader::with_config(
                read_half,
                Direction::BodyToHead,
                config.frame_config(),
            ),
            writer: FrameWriter::new(write_half, Direction::HeadToBody),
        }
    }

    /// Assemble a link from an existing reader and writer.
    pub fn from_parts(reader: FrameReader<R>, writer: FrameWriter<W>) -> Self {
        Self { reader, writer }
    }

    /// Send one head-to-body message.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        self.writer.send(message)?;
        Ok(())
    }

    /// One read attempt with the configured poll timeout.
    pub fn read_frame(&mut self) -> Result<ReadOutcome> {
        Ok(self.reader.read_frame()?)
    }

    /// One read attempt with a one-off poll timeout.
    pub fn read_frame_within(&mut self, poll_timeout: Duration) -> Result<ReadOutcome> {
        Ok(self.reader.read_frame_within(poll_timeout)?)
    }

    pub fn reader_stats(&self) -> ReaderStats {
        self.reader.stats()
    }

    pub fn frames_sent(&self) -> u64 {
        self.writer.frames_sent()
    }

    pub fn reader(&self) -> &FrameReader<R> {
        &self.reader
    }

    pub fn writer(&self) -> &FrameWriter<W> {
        &self.writer
    }

    /// Split into the underlying reader and writer.
    pub fn into_parts(self) -> (FrameReader<R>, FrameWriter<W>) {
        (self.reader, self.writer)
    }
}
