//! Diagnostic body carried by abort chunks.
//!
//! An abort chunk body holds a status code followed by an optional reason
//! string:
//!
//! ```text
//! [u32 status code][i32 reason length, -1 for null][UTF-8 reason bytes]
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::MalformedChunk;
use crate::byte_order::{read_wire_i32, read_wire_u32, write_wire_i32, write_wire_u32};

const STATUS_LEN: usize = 4;
const LENGTH_PREFIX_LEN: usize = 4;

/// Status code and reason explaining why a message was aborted.
///
/// # Examples
///
/// ```
/// use uaframe::chunk::ErrorPayload;
///
/// let payload = ErrorPayload::new(0x8007_0000, Some("too large".into()));
/// let decoded = ErrorPayload::decode(&payload.encode()).expect("valid payload");
/// assert_eq!(decoded, payload);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorPayload {
    status_code: u32,
    reason: Option<String>,
}

impl ErrorPayload {
    /// Create a payload from a status code and optional reason.
    #[must_use]
    pub const fn new(status_code: u32, reason: Option<String>) -> Self {
        Self {
            status_code,
            reason,
        }
    }

    /// Return the status code.
    #[must_use]
    pub const fn status_code(&self) -> u32 { self.status_code }

    /// Return the reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> { self.reason.as_deref() }

    /// Length of the encoded payload in bytes.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        STATUS_LEN + LENGTH_PREFIX_LEN + self.reason.as_ref().map_or(0, String::len)
    }

    /// Encode the payload into its wire form.
    ///
    /// # Panics
    ///
    /// Panics if the reason is longer than `i32::MAX` bytes, which no chunk
    /// body can carry.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_slice(&write_wire_u32(self.status_code));
        match &self.reason {
            Some(reason) => {
                let len = i32::try_from(reason.len())
                    .unwrap_or_else(|_| panic!("abort reason of {} bytes", reason.len()));
                buf.put_slice(&write_wire_i32(len));
                buf.put_slice(reason.as_bytes());
            }
            None => buf.put_slice(&write_wire_i32(-1)),
        }
        buf.freeze()
    }

    /// Decode a payload from an abort chunk body.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedChunk::Truncated`] when the body ends early and
    /// [`MalformedChunk::InvalidAbortPayload`] for negative lengths other than
    /// `-1`, trailing bytes, or a reason that is not valid UTF-8.
    pub fn decode(body: &[u8]) -> Result<Self, MalformedChunk> {
        let need = STATUS_LEN + LENGTH_PREFIX_LEN;
        let (Some(status), Some(len)) = (body.get(..STATUS_LEN), body.get(STATUS_LEN..need)) else {
            return Err(MalformedChunk::Truncated {
                have: body.len(),
                need,
            });
        };
        let status_code = read_wire_u32([status[0], status[1], status[2], status[3]]);
        let len = read_wire_i32([len[0], len[1], len[2], len[3]]);
        let rest = &body[need..];

        let reason = match len {
            -1 => None,
            len if len < 0 => {
                return Err(MalformedChunk::InvalidAbortPayload("negative reason length"));
            }
            len => {
                let len = usize::try_from(len)
                    .map_err(|_| MalformedChunk::InvalidAbortPayload("reason length overflow"))?;
                let bytes = rest.get(..len).ok_or(MalformedChunk::Truncated {
                    have: body.len(),
                    need: need + len,
                })?;
                let reason = std::str::from_utf8(bytes)
                    .map_err(|_| MalformedChunk::InvalidAbortPayload("reason is not UTF-8"))?;
                Some(reason.to_owned())
            }
        };

        if rest.len() != reason.as_ref().map_or(0, String::len) {
            return Err(MalformedChunk::InvalidAbortPayload("trailing bytes"));
        }
        Ok(Self::new(status_code, reason))
    }
}
