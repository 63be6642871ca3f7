//! Payload checksum.
//!
//! CRC-32 (IEEE) over payload bytes only; the header is not covered.

/// First byte of both sync tags. Its last position inside a corrupted frame
/// hints at where the next frame began.
pub const SYNC_MARKER: u8 = 0xAA;

/// Compute the checksum of `payload`.
pub fn checksum(payload: &[u8]) -> u32 {
    crc32fast::hash(payload)
}

/// Returns true when `payload` matches `expected`.
pub fn validate(payload: &[u8], expected: u32) -> bool {
    checksum(payload) == expected
}

/// Rough count of bytes lost from a corrupted frame.
///
/// Scans `region` (everything after the header) for the last sync marker and
/// assumes the bytes from there on belong to a frame that started early.
/// With no marker the whole region counts as dropped.
/// Diagnostic only; the reader never resynchronizes from this value.
pub fn estimate_dropped_bytes(region: &[u8]) -> usize {
    region
        .iter()
        .rposition(|&b| b == SYNC_MARKER)
        .map_or(region.len(), |idx| region.len() - idx)
}
