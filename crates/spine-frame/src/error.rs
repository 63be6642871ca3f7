use crate::protocol::{Direction, PayloadType};

/// A payload buffer did not have the fixed wire size of its struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("payload is {actual} bytes, wire size is {expected}")]
    Length { expected: usize, actual: usize },
}

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload type value is not part of the protocol.
    #[error("unknown payload type 0x{0:04x}")]
    UnknownPayloadType(u16),

    /// The payload type is never sent in this direction.
    #[error("payload type {payload_type} is not valid in {direction} frames")]
    InvalidForDirection {
        payload_type: PayloadType,
        direction: Direction,
    },

    /// The payload length differs from the length table entry.
    #[error("payload type {payload_type} expects {expected} bytes, got {actual}")]
    LengthMismatch {
        payload_type: PayloadType,
        expected: usize,
        actual: usize,
    },

    /// A typed payload could not be encoded or decoded.
    #[error("payload codec error: {0}")]
    Codec(#[from] CodecError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device hung up.
    #[error("connection closed")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
