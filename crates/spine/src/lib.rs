//! Head-side driver for the robot's head/body serial link.
//!
//! # Crate Structure
//!
//! - [`transport`]: Non-blocking serial port and the transport contract
//! - [`frame`]: Sync-tagged, CRC-checked framing and typed payloads
//! - [`link`]: Startup handshake and the per-tick session state machine (behind `link` feature)

/// Re-export transport types.
pub mod transport {
    pub use spine_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use spine_frame::*;
}

/// Re-export link types (requires `link` feature).
#[cfg(feature = "link")]
pub mod link {
    pub use spine_link::*;
}
