//! Typed frame contents, one variant per `(payload type, direction)`.

use crate::error::{FrameError, Result};
use crate::payload::{
    AckMessage, BodyToHead, BootFrame, Codec, ContactData, HeadToBody, LightState, VersionInfo,
    WriteDfu,
};
use crate::protocol::{payload_len, Direction, PayloadType};

/// A decoded payload.
///
/// Decoding happens once in the reader, so everything downstream matches on
/// this enum instead of on raw type codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Ask the body to enter application mode. Empty in both directions.
    ModeChange,
    /// Actuator update (head to body).
    HeadData(HeadToBody),
    /// Sensor snapshot (body to head).
    BodyData(Box<BodyToHead>),
    /// Ask the body for its version (head to body, empty).
    VersionRequest,
    /// Version report (body to head).
    Version(VersionInfo),
    Ack(AckMessage),
    Erase,
    Validate,
    DfuPacket(Box<WriteDfu>),
    /// Charge-contact traffic, opaque to the link.
    ContactData(ContactData),
    /// Bootloader heartbeat (body to head).
    BootFrame(BootFrame),
    /// Calm-mode lights (head to body).
    LightState(LightState),
}

impl Message {
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Message::ModeChange => PayloadType::ModeChange,
            Message::HeadData(_) | Message::BodyData(_) => PayloadType::DataFrame,
            Message::VersionRequest | Message::Version(_) => PayloadType::Version,
            Message::Ack(_) => PayloadType::Ack,
            Message::Erase => PayloadType::Erase,
            Message::Validate => PayloadType::Validate,
            Message::DfuPacket(_) => PayloadType::DfuPacket,
            Message::ContactData(_) => PayloadType::ContactData,
            Message::BootFrame(_) => PayloadType::BootFrame,
            Message::LightState(_) => PayloadType::LightState,
        }
    }

    /// Returns true when this message may travel in `direction`.
    pub fn allowed_in(&self, direction: Direction) -> bool {
        match self {
            Message::ModeChange | Message::Ack(_) | Message::ContactData(_) => true,
            Message::HeadData(_)
            | Message::VersionRequest
            | Message::Erase
            | Message::Validate
            | Message::DfuPacket(_)
            | Message::LightState(_) => direction == Direction::HeadToBody,
            Message::BodyData(_) | Message::Version(_) | Message::BootFrame(_) => {
                direction == Direction::BodyToHead
            }
        }
    }

    /// Encoded payload length in `direction`.
    pub fn payload_len(&self, direction: Direction) -> Result<usize> {
        let payload_type = self.payload_type();
        if !self.allowed_in(direction) {
            return Err(FrameError::InvalidForDirection {
                payload_type,
                direction,
            });
        }
        payload_len(payload_type, direction).ok_or(FrameError::InvalidForDirection {
            payload_type,
            direction,
        })
    }

    /// Encode the payload into `dst`, returning the number of bytes written.
    pub fn encode_payload(&self, direction: Direction, dst: &mut [u8]) -> Result<usize> {
        let len = self.payload_len(direction)?;
        if dst.len() < len {
            return Err(FrameError::LengthMismatch {
                payload_type: self.payload_type(),
                expected: len,
                actual: dst.len(),
            });
        }
        let dst = &mut dst[..len];
        match self {
            Message::ModeChange | Message::VersionRequest | Message::Erase | Message::Validate => {}
            Message::HeadData(head) => head.encode(dst)?,
            Message::BodyData(body) => body.encode(dst)?,
            Message::Version(info) => info.encode(dst)?,
            Message::Ack(ack) => ack.encode(dst)?,
            Message::DfuPacket(dfu) => dfu.encode(dst)?,
            Message::ContactData(contact) => contact.encode(dst)?,
            Message::BootFrame(boot) => boot.encode(dst)?,
            Message::LightState(lights) => lights.encode(dst)?,
        }
        Ok(len)
    }

    /// Decode a payload whose header was already validated.
    pub fn decode(
        payload_type: PayloadType,
        direction: Direction,
        payload: &[u8],
    ) -> Result<Self> {
        let expected = payload_len(payload_type, direction).ok_or(
            FrameError::InvalidForDirection {
                payload_type,
                direction,
            },
        )?;
        if payload.len() != expected {
            return Err(FrameError::LengthMismatch {
                payload_type,
                expected,
                actual: payload.len(),
            });
        }

        use Direction::{BodyToHead as B2H, HeadToBody as H2B};
        let message = match (payload_type, direction) {
            (PayloadType::ModeChange, _) => Message::ModeChange,
            (PayloadType::DataFrame, H2B) => Message::HeadData(HeadToBody::decode(payload)?),
            (PayloadType::DataFrame, B2H) => {
                Message::BodyData(Box::new(BodyToHead::decode(payload)?))
            }
            (PayloadType::Version, H2B) => Message::VersionRequest,
            (PayloadType::Version, B2H) => Message::Version(VersionInfo::decode(payload)?),
            (PayloadType::Ack, _) => Message::Ack(AckMessage::decode(payload)?),
            (PayloadType::Erase, _) => Message::Erase,
            (PayloadType::Validate, _) => Message::Validate,
            (PayloadType::DfuPacket, _) => Message::DfuPacket(Box::new(WriteDfu::decode(payload)?)),
            (PayloadType::ContactData, _) => {
                Message::ContactData(ContactData::decode(payload)?)
            }
            (PayloadType::BootFrame, _) => Message::BootFrame(BootFrame::decode(payload)?),
            (PayloadType::LightState, _) => Message::LightState(LightState::decode(payload)?),
        };
        Ok(message)
    }
}
