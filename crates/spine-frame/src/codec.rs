use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::crc;
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::protocol::{payload_len, Direction, PayloadType, CRC_LEN, HEADER_LEN, MAX_PAYLOAD_LEN};

/// Default wait for the line to become readable.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Default number of bytes one `read_frame` call may consume before giving up.
pub const DEFAULT_SCAN_BUDGET: usize = 4096;

/// A validated frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub direction: Direction,
    pub payload_type: PayloadType,
    pub payload_len: u16,
}

impl FrameHeader {
    /// Build a header for `payload_type`, checking `len` against the table.
    pub fn new(direction: Direction, payload_type: PayloadType, len: usize) -> Result<Self> {
        let expected = payload_len(payload_type, direction).ok_or(
            FrameError::InvalidForDirection {
                payload_type,
                direction,
            },
        )?;
        if len != expected {
            return Err(FrameError::LengthMismatch {
                payload_type,
                expected,
                actual: len,
            });
        }
        Ok(Self {
            direction,
            payload_type,
            // Table entries never exceed MAX_PAYLOAD_LEN.
            payload_len: expected as u16,
        })
    }

    /// Parse and validate raw header bytes.
    pub fn parse(raw: &[u8; HEADER_LEN], direction: Direction) -> Result<Self> {
        let raw_type = u16::from_le_bytes([raw[4], raw[5]]);
        let raw_len = u16::from_le_bytes([raw[6], raw[7]]);
        let payload_type = PayloadType::try_from(raw_type)?;
        Self::new(direction, payload_type, raw_len as usize)
    }

    /// Wire bytes: sync tag, payload type, payload length.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        let mut dst = &mut out[..];
        dst.put_u32_le(self.direction.sync_tag());
        dst.put_u16_le(self.payload_type.as_u16());
        dst.put_u16_le(self.payload_len);
        out
    }

    /// Header + payload + checksum.
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.payload_len as usize + CRC_LEN
    }
}

/// A complete, checksum-verified frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub message: Message,
    pub checksum: u32,
}

impl Frame {
    pub fn payload_type(&self) -> PayloadType {
        self.header.payload_type
    }

    /// The total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.header.frame_len()
    }
}

/// Encode a complete frame for `direction` into `dst`.
///
/// Wire format:
/// ```text
/// ┌───────────┬───────────┬───────────┬──────────────┬──────────┐
/// │ Sync (4B) │ Type (2B) │ Len (2B)  │ Payload      │ CRC (4B) │
/// │ LE u32    │ LE u16    │ LE u16    │ (Len bytes)  │ LE u32   │
/// └───────────┴───────────┴───────────┴──────────────┴──────────┘
/// ```
/// The CRC covers the payload only.
pub fn encode_frame(direction: Direction, message: &Message, dst: &mut BytesMut) -> Result<usize> {
    let mut payload = [0u8; MAX_PAYLOAD_LEN];
    let len = message.encode_payload(direction, &mut payload)?;
    let header = FrameHeader::new(direction, message.payload_type(), len)?;
    let payload = &payload[..len];

    dst.reserve(header.frame_len());
    dst.put_slice(&header.to_bytes());
    dst.put_slice(payload);
    dst.put_u32_le(crc::checksum(payload));
    Ok(header.frame_len())
}

/// Configuration for the frame reader.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Longest single wait for the line to become readable. Default: 1 s.
    pub poll_timeout: Duration,
    /// Bytes one `read_frame` call may consume without producing a frame
    /// before it returns `Pending`. Default: 4096.
    pub scan_budget: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            scan_budget: DEFAULT_SCAN_BUDGET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{AckMessage, HeadToBody};
    use crate::protocol::MAX_FRAME_LEN;

    #[test]
    fn header_roundtrip() {
        let header = FrameHeader::new(Direction::HeadToBody, PayloadType::DataFrame, 28).unwrap();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..4], b"\xAAH2B");
        assert_eq!(&bytes[4..6], b"fd");
        assert_eq!(&bytes[6..8], &[28, 0]);
        assert_eq!(FrameHeader::parse(&bytes, Direction::HeadToBody).unwrap(), header);
        assert_eq!(header.frame_len(), 40);
    }

    #[test]
    fn header_rejects_table_violations() {
        assert!(matches!(
            FrameHeader::new(Direction::HeadToBody, PayloadType::Ack, 5),
            Err(FrameError::LengthMismatch { expected: 4, actual: 5, .. })
        ));
        assert!(matches!(
            FrameHeader::new(Direction::HeadToBody, PayloadType::BootFrame, 4),
            Err(FrameError::InvalidForDirection { .. })
        ));

        let mut raw = [0u8; HEADER_LEN];
        raw[4..6].copy_from_slice(&0x1234u16.to_le_bytes());
        assert!(matches!(
            FrameHeader::parse(&raw, Direction::BodyToHead),
            Err(FrameError::UnknownPayloadType(0x1234))
        ));
    }

    #[test]
    fn encoded_frame_layout() {
        let mut wire = BytesMut::new();
        let ack = Message::Ack(AckMessage { status: 1 });
        let n = encode_frame(Direction::BodyToHead, &ack, &mut wire).unwrap();
        assert_eq!(n, HEADER_LEN + 4 + CRC_LEN);
        assert_eq!(wire.len(), n);
        assert_eq!(&wire[..4], b"\xAAB2H");
        assert_eq!(&wire[8..12], &[1, 0, 0, 0]);
        assert_eq!(&wire[12..16], &crc::checksum(&[1, 0, 0, 0]).to_le_bytes());
    }

    #[test]
    fn empty_payload_frame_still_carries_crc() {
        let mut wire = BytesMut::new();
        encode_frame(Direction::HeadToBody, &Message::ModeChange, &mut wire).unwrap();
        assert_eq!(wire.len(), HEADER_LEN + CRC_LEN);
        assert_eq!(&wire[HEADER_LEN..], &crc::checksum(&[]).to_le_bytes());
    }

    #[test]
    fn largest_frame_fits_buffer() {
        let mut wire = BytesMut::new();
        let dfu = Message::DfuPacket(Box::default());
        let n = encode_frame(Direction::HeadToBody, &dfu, &mut wire).unwrap();
        assert!(n <= MAX_FRAME_LEN);

        let head = Message::HeadData(HeadToBody::default());
        assert!(encode_frame(Direction::BodyToHead, &head, &mut wire).is_err());
    }

    #[test]
    fn default_config() {
        let cfg = FrameConfig::default();
        assert_eq!(cfg.poll_timeout, Duration::from_secs(1));
        assert_eq!(cfg.scan_budget, 4096);
    }
}
