//! Byte-at-a-time frame synchronization.
//!
//! [`sync`] is fed the receive buffer after each new byte and reports how
//! many leading bytes still form a valid partial (or complete) header.
//! Because every surviving match is a prefix of the sync tag, and the buffer
//! always starts with the tag, a rejected match never has to move bytes: the
//! caller just truncates to the returned length.

use crate::protocol::{header_is_valid, Direction, HEADER_LEN, SYNC_LEN};

/// Advance synchronization by one byte.
///
/// `buf[..index]` is the match confirmed so far and `buf[index]` is the byte
/// that just arrived. Returns the new confirmed length: `0` for a full
/// resync, `1..SYNC_LEN` while the tag is still matching, anything below
/// [`HEADER_LEN`] while header fields are arriving, and exactly `HEADER_LEN`
/// once the header agrees with the payload length table.
pub fn sync(buf: &[u8], index: usize, direction: Direction) -> usize {
    debug_assert!(index < HEADER_LEN && index < buf.len());
    let tag = direction.sync_bytes();

    if index < SYNC_LEN {
        if buf[index] == tag[index] {
            return index + 1;
        }
        // The new byte, and any earlier bytes after the first, may start the
        // real tag.
        return longest_tag_suffix(&buf[1..=index], &tag);
    }

    if index + 1 < HEADER_LEN {
        return index + 1;
    }

    let raw_type = u16::from_le_bytes([buf[4], buf[5]]);
    let raw_len = u16::from_le_bytes([buf[6], buf[7]]);
    if header_is_valid(raw_type, raw_len, direction) {
        return HEADER_LEN;
    }

    tracing::trace!(
        raw_type = format_args!("0x{raw_type:04x}"),
        raw_len,
        "header rejected by length table"
    );
    longest_tag_suffix(&buf[SYNC_LEN..HEADER_LEN], &tag)
}

/// Length of the longest suffix of `bytes` that is a prefix of `tag`.
fn longest_tag_suffix(bytes: &[u8], tag: &[u8; SYNC_LEN]) -> usize {
    let max = bytes.len().min(SYNC_LEN);
    (1..=max)
        .rev()
        .find(|&k| bytes[bytes.len() - k..] == tag[..k])
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::protocol::{payload_len, PayloadType};

    const DIR: Direction = Direction::BodyToHead;

    /// Feed `bytes` through the synchronizer the way the reader does.
    fn feed(bytes: &[u8]) -> (Vec<u8>, usize) {
        let mut buf = Vec::new();
        let mut confirmed = 0;
        for &byte in bytes {
            buf.truncate(confirmed);
            buf.push(byte);
            confirmed = sync(&buf, confirmed, DIR);
            if confirmed == HEADER_LEN {
                buf.truncate(HEADER_LEN);
                break;
            }
        }
        buf.truncate(confirmed);
        (buf, confirmed)
    }

    fn header(ty: PayloadType, len: u16) -> Vec<u8> {
        let mut out = DIR.sync_bytes().to_vec();
        out.extend_from_slice(&ty.as_u16().to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out
    }

    #[test]
    fn confirms_valid_header() {
        let (buf, confirmed) = feed(&header(PayloadType::BootFrame, 4));
        assert_eq!(confirmed, HEADER_LEN);
        assert_eq!(buf, header(PayloadType::BootFrame, 4));
    }

    #[test]
    fn partial_tag_reports_progress() {
        let tag = DIR.sync_bytes();
        assert_eq!(feed(&tag[..1]).1, 1);
        assert_eq!(feed(&tag[..3]).1, 3);
        assert_eq!(feed(&[0x00]).1, 0);
    }

    #[test]
    fn mismatched_byte_can_restart_the_tag() {
        // AA AA: the second AA is a fresh start.
        let tag = DIR.sync_bytes();
        let (_, confirmed) = feed(&[tag[0], tag[0]]);
        assert_eq!(confirmed, 1);

        let mut stream = vec![tag[0], tag[1], tag[0]];
        stream.extend_from_slice(&tag[1..]);
        stream.extend_from_slice(&PayloadType::BootFrame.as_u16().to_le_bytes());
        stream.extend_from_slice(&4u16.to_le_bytes());
        assert_eq!(feed(&stream).1, HEADER_LEN);
    }

    #[test]
    fn opposite_direction_tag_is_not_accepted() {
        let wrong = Direction::HeadToBody.sync_bytes();
        assert!(feed(&wrong).1 < SYNC_LEN);
    }

    #[test]
    fn rejected_header_keeps_tag_prefix_from_length_bytes() {
        let tag = DIR.sync_bytes();
        let mut stream = tag.to_vec();
        // Type is garbage; the last two "header" bytes start the next tag.
        stream.extend_from_slice(&[0x01, 0x02, tag[0], tag[1]]);
        let (buf, confirmed) = feed(&stream);
        assert_eq!(confirmed, 2);
        assert_eq!(buf, tag[..2].to_vec());

        stream.extend_from_slice(&tag[2..]);
        stream.extend_from_slice(&PayloadType::ModeChange.as_u16().to_le_bytes());
        stream.extend_from_slice(&0u16.to_le_bytes());
        assert_eq!(feed(&stream).1, HEADER_LEN);
    }

    #[test]
    fn tag_in_header_fields_is_recovered() {
        let tag = DIR.sync_bytes();
        let mut stream = tag.to_vec();
        stream.extend_from_slice(&tag);
        let (buf, confirmed) = feed(&stream);
        assert_eq!(confirmed, SYNC_LEN);
        assert_eq!(buf, tag.to_vec());
    }

    #[test]
    fn wrong_length_for_known_type_is_rejected() {
        let expected = payload_len(PayloadType::DataFrame, DIR).unwrap() as u16;
        let (_, confirmed) = feed(&header(PayloadType::DataFrame, expected - 1));
        assert_eq!(confirmed, 0);
    }

    proptest! {
        #[test]
        fn mismatched_length_never_confirms(
            ty_index in 0usize..PayloadType::ALL.len(),
            len in any::<u16>(),
        ) {
            let ty = PayloadType::ALL[ty_index];
            prop_assume!(payload_len(ty, DIR) != Some(len as usize));
            let (_, confirmed) = feed(&header(ty, len));
            prop_assert!(confirmed < HEADER_LEN);
        }

        #[test]
        fn recovers_after_garbage(garbage in proptest::collection::vec(any::<u8>(), 0..64)) {
            let tag = DIR.sync_bytes();
            prop_assume!(!garbage.windows(SYNC_LEN).any(|w| w == tag));
            let mut stream = garbage;
            stream.extend_from_slice(&header(PayloadType::Version, 40));
            let (buf, confirmed) = feed(&stream);
            prop_assert_eq!(confirmed, HEADER_LEN);
            prop_assert_eq!(buf, header(PayloadType::Version, 40));
        }
    }
}
