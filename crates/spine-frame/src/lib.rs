//! Sync-tagged, checksummed framing for the head/body spine link.
//!
//! Every frame on the wire is:
//! - a 4-byte sync tag that also encodes the direction of travel
//! - a 2-byte payload type and a 2-byte payload length, both little-endian
//! - a fixed-size payload whose length is dictated by the type and direction
//! - a CRC-32 over the payload
//!
//! [`FrameReader`] recovers frames from an untrusted byte stream and hands
//! back typed [`Message`]s; [`FrameWriter`] refuses to emit anything the
//! length table does not allow.

pub mod codec;
pub mod crc;
pub mod error;
pub mod message;
pub mod payload;
pub mod protocol;
pub mod reader;
pub mod sync;
pub mod writer;

pub use codec::{encode_frame, Frame, FrameConfig, FrameHeader};
pub use error::{CodecError, FrameError, Result};
pub use message::Message;
pub use payload::{
    AckMessage, BatteryState, BodyToHead, BootFrame, Codec, ContactData, HeadToBody, LightState,
    MotorState, ProxSensor, VersionInfo, WriteDfu,
};
pub use protocol::{payload_len, Direction, PayloadType, HEADER_LEN, MAX_FRAME_LEN};
pub use reader::{FrameReader, ReadOutcome, ReaderStats};
pub use writer::FrameWriter;
