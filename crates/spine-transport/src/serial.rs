use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits, TTYPort};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{poll_fd, Transport};

/// Default spine device on the head.
pub const DEFAULT_DEVICE: &str = "/dev/ttyHS0";

/// Default spine line rate.
pub const DEFAULT_BAUD_RATE: u32 = 3_000_000;

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Path to the tty device.
    pub device: PathBuf,
    /// Line rate in bits per second.
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// A raw, non-blocking serial port.
///
/// The line is configured as 8 data bits, no parity, 2 stop bits, no flow
/// control. Reads and writes never wait; a call that would block fails
/// with `WouldBlock`. The device is closed on drop.
pub struct SerialPort {
    port: TTYPort,
    path: PathBuf,
}

impl SerialPort {
    /// Open and configure a serial port.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        Self::open_path(&config.device, config.baud_rate)
    }

    /// Open and configure the device at `path` at `baud_rate`.
    pub fn open_path(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if baud_rate == 0 {
            return Err(TransportError::UnsupportedBaud(baud_rate));
        }

        debug!(?path, baud_rate, "opening serial port");
        let port = serialport::new(path.to_string_lossy(), baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::Two)
            .flow_control(FlowControl::None)
            .timeout(Duration::ZERO)
            .open_native()
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source: source.into(),
            })?;

        info!(?path, baud_rate, "serial port configured");
        Ok(Self { port, path })
    }

    /// Duplicate the descriptor so reads and writes can be owned separately.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self
            .port
            .try_clone_native()
            .map_err(|source| TransportError::Io(source.into()))?;
        Ok(Self {
            port,
            path: self.path.clone(),
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        "serial"
    }
}

/// The port reports an expired zero timeout as `TimedOut`.
fn would_block(err: std::io::Error) -> std::io::Error {
    if err.kind() == ErrorKind::TimedOut {
        std::io::Error::from(ErrorKind::WouldBlock)
    } else {
        err
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf).map_err(would_block)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf).map_err(would_block)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush().map_err(would_block)
    }
}

impl Transport for SerialPort {
    fn poll_readable(&mut self, timeout: Duration) -> std::io::Result<bool> {
        poll_fd(self.port.as_raw_fd(), timeout)
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("fd", &self.port.as_raw_fd())
            .finish()
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        debug!(path = ?self.path, fd = self.port.as_raw_fd(), "closing serial port");
    }
}
