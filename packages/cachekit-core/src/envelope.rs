//! Binary envelope used by the byte backend to carry metadata alongside a payload.
//!
//! Fixed 36-byte little-endian header followed by the payload:
//!
//! ```text
//! 0   i64  created_at_millis
//! 8   i64  absolute_expiration_millis  (0 = none)
//! 16  i64  sliding_window_millis       (0 = none)
//! 24  i64  stale_window_millis         (0 = none)
//! 32  i32  payload_length (>= 0)
//! 36  ..   payload bytes
//! ```
//!
//! No version byte is defined. A future layout change must prepend a magic and
//! version; this implementation does not negotiate versions (see `DESIGN.md`).

use crate::error::EnvelopeError;
use crate::metadata::EntryMetadata;

/// Size in bytes of the fixed header.
pub const HEADER_LEN: usize = 36;

/// Encodes `metadata` and `payload` into a single byte blob.
#[must_use]
pub fn encode(metadata: &EntryMetadata, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&metadata.created_at.to_le_bytes());
    out.extend_from_slice(&metadata.absolute_expiration.to_le_bytes());
    out.extend_from_slice(&metadata.sliding_window_millis.to_le_bytes());
    out.extend_from_slice(&metadata.stale_window_millis.to_le_bytes());
    out.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Decodes a blob produced by [`encode`] back into metadata and a payload slice.
///
/// Returns an error on truncation or a negative declared payload length; the
/// byte backend treats any such error as an expired entry and purges the key.
pub fn decode(blob: &[u8]) -> Result<(EntryMetadata, &[u8]), EnvelopeError> {
    if blob.len() < HEADER_LEN {
        return Err(EnvelopeError::Truncated { len: blob.len() });
    }

    let created_at = read_i64(blob, 0);
    let absolute_expiration = read_i64(blob, 8);
    let sliding_window_millis = read_i64(blob, 16);
    let stale_window_millis = read_i64(blob, 24);
    let declared_len = read_i32(blob, 32);

    if declared_len < 0 {
        return Err(EnvelopeError::NegativePayloadLength { declared: declared_len });
    }
    let declared_len = declared_len as u32;

    let payload = &blob[HEADER_LEN..];
    if payload.len() < declared_len as usize {
        return Err(EnvelopeError::PayloadTruncated {
            declared: declared_len,
            found: payload.len(),
        });
    }

    let metadata = EntryMetadata::new(
        created_at,
        absolute_expiration,
        sliding_window_millis,
        stale_window_millis,
    );
    Ok((metadata, &payload[..declared_len as usize]))
}

fn read_i64(blob: &[u8], offset: usize) -> i64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&blob[offset..offset + 8]);
    i64::from_le_bytes(buf)
}

fn read_i32(blob: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&blob[offset..offset + 4]);
    i32::from_le_bytes(buf)
}
