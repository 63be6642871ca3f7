//! Serial transport adapter for the spine link.
//!
//! This is the lowest layer of the spine stack: a thin, non-blocking byte
//! pipe to the body microcontroller. Reads never block; callers wait for
//! data with [`Transport::poll_readable`], which is bounded by a timeout.
//!
//! - [`SerialPort`] opens a tty in raw 8N2 mode (Unix only)
//! - [`Transport`] is the contract the frame layer consumes
//! - `mock` provides a scripted transport for tests (feature `mock`)

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{Result, TransportError};
pub use traits::Transport;

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, DEFAULT_BAUD_RATE, DEFAULT_DEVICE};
