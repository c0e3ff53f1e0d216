//! Structural check applied to a raw chunk before anything trusts it.

use super::{COMMON_HEADER_LEN, MalformedChunk};
use crate::byte_order::read_wire_u32_at;

/// Check that the declared chunk length equals the buffer length.
///
/// Only the length field of the common header is read. The check is pure and
/// identical for chunks produced locally and chunks received from a peer.
///
/// # Errors
///
/// Returns [`MalformedChunk::Truncated`] when the buffer cannot hold the
/// common header and [`MalformedChunk::LengthMismatch`] when the declared
/// length differs from `chunk.len()`.
///
/// # Examples
///
/// ```
/// use uaframe::chunk::{MalformedChunk, validate_chunk};
///
/// let mut chunk = b"MSGF\x0c\x00\x00\x00\x01\x00\x00\x00".to_vec();
/// assert_eq!(validate_chunk(&chunk), Ok(()));
///
/// chunk.push(0);
/// assert_eq!(
///     validate_chunk(&chunk),
///     Err(MalformedChunk::LengthMismatch { declared: 12, actual: 13 })
/// );
/// ```
pub fn validate_chunk(chunk: &[u8]) -> Result<(), MalformedChunk> {
    if chunk.len() < COMMON_HEADER_LEN {
        return Err(MalformedChunk::Truncated {
            have: chunk.len(),
            need: COMMON_HEADER_LEN,
        });
    }
    let declared = read_wire_u32_at(chunk, 4).ok_or(MalformedChunk::Truncated {
        have: chunk.len(),
        need: COMMON_HEADER_LEN,
    })?;
    if usize::try_from(declared).ok() != Some(chunk.len()) {
        return Err(MalformedChunk::LengthMismatch {
            declared,
            actual: chunk.len(),
        });
    }
    Ok(())
}
