//! Wire constants, payload types and the payload length table.
//!
//! Every frame starts with a direction-specific 4-byte sync tag, followed by
//! a 2-byte payload type and a 2-byte payload length (all little-endian).
//! The length must match the table entry for `(payload_type, direction)`.

use std::fmt;

use serde::Serialize;

use crate::error::FrameError;
use crate::payload::{
    AckMessage, BodyToHead, BootFrame, Codec, ContactData, HeadToBody, LightState, VersionInfo,
    WriteDfu,
};

/// Sync tag on head→body frames ("\xAAH2B" on the wire).
pub const SYNC_HEAD_TO_BODY: u32 = 0x4232_48AA;

/// Sync tag on body→head frames ("\xAAB2H" on the wire).
pub const SYNC_BODY_TO_HEAD: u32 = 0x4832_42AA;

/// Sync tag length.
pub const SYNC_LEN: usize = 4;

/// Payload type field length.
pub const TYPE_LEN: usize = 2;

/// Payload length field length.
pub const LENGTH_LEN: usize = 2;

/// Frame header: sync (4) + payload type (2) + payload length (2) = 8 bytes.
pub const HEADER_LEN: usize = SYNC_LEN + TYPE_LEN + LENGTH_LEN;

/// Trailing checksum length.
pub const CRC_LEN: usize = 4;

/// Largest frame either side will ever buffer.
pub const MAX_FRAME_LEN: usize = 1048;

/// Largest payload that fits in [`MAX_FRAME_LEN`].
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - HEADER_LEN - CRC_LEN;

/// Which way a frame travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Application processor to microcontroller.
    HeadToBody,
    /// Microcontroller to application processor.
    BodyToHead,
}

impl Direction {
    /// The sync tag value for frames in this direction.
    pub const fn sync_tag(self) -> u32 {
        match self {
            Direction::HeadToBody => SYNC_HEAD_TO_BODY,
            Direction::BodyToHead => SYNC_BODY_TO_HEAD,
        }
    }

    /// The sync tag as it appears on the wire.
    pub const fn sync_bytes(self) -> [u8; SYNC_LEN] {
        self.sync_tag().to_le_bytes()
    }

    /// The opposite direction.
    pub const fn reverse(self) -> Self {
        match self {
            Direction::HeadToBody => Direction::BodyToHead,
            Direction::BodyToHead => Direction::HeadToBody,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::HeadToBody => "head->body",
            Direction::BodyToHead => "body->head",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload type identifiers. Values are two ASCII characters, little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum PayloadType {
    /// Request a running-mode change ("dm").
    ModeChange = 0x6d64,
    /// Periodic sensor (body) or actuator (head) data ("fd").
    DataFrame = 0x6466,
    /// Version request (head) or version report (body) ("vr").
    Version = 0x7276,
    /// Command acknowledgement ("ak").
    Ack = 0x6b61,
    /// Erase application flash ("xx").
    Erase = 0x7878,
    /// Validate a freshly written image ("ts").
    Validate = 0x7374,
    /// Firmware update block ("uf").
    DfuPacket = 0x6675,
    /// Charge-contact command traffic ("dc").
    ContactData = 0x6364,
    /// Degraded frame from the bootloader ("bf").
    BootFrame = 0x6662,
    /// Light-only update used while the body is in calm mode ("ll").
    LightState = 0x6c6c,
}

impl PayloadType {
    pub const ALL: [PayloadType; 10] = [
        PayloadType::ModeChange,
        PayloadType::DataFrame,
        PayloadType::Version,
        PayloadType::Ack,
        PayloadType::Erase,
        PayloadType::Validate,
        PayloadType::DfuPacket,
        PayloadType::ContactData,
        PayloadType::BootFrame,
        PayloadType::LightState,
    ];

    pub const fn from_u16(raw: u16) -> Option<Self> {
        let ty = match raw {
            0x6d64 => PayloadType::ModeChange,
            0x6466 => PayloadType::DataFrame,
            0x7276 => PayloadType::Version,
            0x6b61 => PayloadType::Ack,
            0x7878 => PayloadType::Erase,
            0x7374 => PayloadType::Validate,
            0x6675 => PayloadType::DfuPacket,
            0x6364 => PayloadType::ContactData,
            0x6662 => PayloadType::BootFrame,
            0x6c6c => PayloadType::LightState,
            _ => return None,
        };
        Some(ty)
    }

    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Human-readable name for logs.
    pub fn name(self) -> &'static str {
        match self {
            PayloadType::ModeChange => "MODE_CHANGE",
            PayloadType::DataFrame => "DATA_FRAME",
            PayloadType::Version => "VERSION",
            PayloadType::Ack => "ACK",
            PayloadType::Erase => "ERASE",
            PayloadType::Validate => "VALIDATE",
            PayloadType::DfuPacket => "DFU_PACKET",
            PayloadType::ContactData => "CONTACT_DATA",
            PayloadType::BootFrame => "BOOT_FRAME",
            PayloadType::LightState => "LIGHT_STATE",
        }
    }
}

impl TryFrom<u16> for PayloadType {
    type Error = FrameError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        PayloadType::from_u16(raw).ok_or(FrameError::UnknownPayloadType(raw))
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected payload length for `(payload_type, direction)`.
///
/// Returns `None` when the type is never sent in that direction; such a
/// header is invalid.
pub const fn payload_len(payload_type: PayloadType, direction: Direction) -> Option<usize> {
    use Direction::{BodyToHead as B2H, HeadToBody as H2B};

    let len = match (payload_type, direction) {
        (PayloadType::ModeChange, _) => 0,
        (PayloadType::DataFrame, H2B) => HeadToBody::WIRE_LEN,
        (PayloadType::DataFrame, B2H) => BodyToHead::WIRE_LEN,
        (PayloadType::Version, H2B) => 0,
        (PayloadType::Version, B2H) => VersionInfo::WIRE_LEN,
        (PayloadType::Ack, _) => AckMessage::WIRE_LEN,
        (PayloadType::Erase, H2B) => 0,
        (PayloadType::Validate, H2B) => 0,
        (PayloadType::DfuPacket, H2B) => WriteDfu::WIRE_LEN,
        (PayloadType::ContactData, _) => ContactData::WIRE_LEN,
        (PayloadType::BootFrame, B2H) => BootFrame::WIRE_LEN,
        (PayloadType::LightState, H2B) => LightState::WIRE_LEN,
        _ => return None,
    };
    Some(len)
}

/// True when a raw header's type and length agree with the table.
pub fn header_is_valid(raw_type: u16, raw_len: u16, direction: Direction) -> bool {
    match PayloadType::from_u16(raw_type) {
        Some(ty) => payload_len(ty, direction) == Some(raw_len as usize),
        None => false,
    }
}
