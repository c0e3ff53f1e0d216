//! `tokio_util` codec splitting a byte stream into whole chunks.
//!
//! [`ChunkCodec`] frames on the length field of the common chunk header, so
//! a transport can be wrapped in `FramedRead`/`FramedWrite` and yield one
//! [`Bytes`] per chunk. It does not interpret chunk types; decoded chunks are
//! fed to a [`MessageReassembler`](crate::reassembler::MessageReassembler),
//! and encoded chunks normally come from a
//! [`ChunkFramer`](crate::framer::ChunkFramer).

use std::io;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{
    byte_order::read_wire_u32_at,
    chunk::{COMMON_HEADER_LEN, MalformedChunk, validate_chunk},
    config::{DEFAULT_BUFFER_SIZE, TransportLimits},
};

/// Offset of the chunk length field.
const LENGTH_OFFSET: usize = 4;

/// Bytes needed before the chunk length is known.
const LENGTH_PREFIX_END: usize = LENGTH_OFFSET + 4;

/// Chunk-boundary codec with a maximum chunk size.
///
/// # Examples
///
/// ```
/// use bytes::BytesMut;
/// use tokio_util::codec::Decoder;
/// use uaframe::codec::ChunkCodec;
///
/// let mut codec = ChunkCodec::default();
/// let mut buf = BytesMut::from(&b"MSGF\x0d\x00\x00\x00\x01\x00\x00\x00!MSG"[..]);
/// let chunk = codec.decode(&mut buf).expect("valid stream").expect("whole chunk");
/// assert_eq!(chunk.len(), 13);
/// assert_eq!(&buf[..], b"MSG");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkCodec {
    max_chunk_size: usize,
}

impl ChunkCodec {
    /// Create a codec rejecting chunks longer than `max_chunk_size`.
    ///
    /// Values below the common header length are raised to it.
    #[must_use]
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(COMMON_HEADER_LEN),
        }
    }

    /// Create a codec bounded by the negotiated receive buffer.
    #[must_use]
    pub fn from_limits(limits: &TransportLimits) -> Self {
        Self::new(usize::try_from(limits.receive_buffer_size).unwrap_or(usize::MAX))
    }

    /// Largest chunk accepted in either direction.
    #[must_use]
    pub const fn max_chunk_size(&self) -> usize { self.max_chunk_size }

    fn check_declared(&self, declared: u32) -> Result<usize, MalformedChunk> {
        let oversized = MalformedChunk::OversizedChunk {
            declared,
            max: self.max_chunk_size,
        };
        let len = usize::try_from(declared).map_err(|_| oversized.clone())?;
        if len < COMMON_HEADER_LEN {
            return Err(MalformedChunk::UndersizedChunk { declared });
        }
        if len > self.max_chunk_size {
            return Err(oversized);
        }
        Ok(len)
    }
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new(usize::try_from(DEFAULT_BUFFER_SIZE).unwrap_or(usize::MAX))
    }
}

impl Decoder for ChunkCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(declared) = read_wire_u32_at(src, LENGTH_OFFSET) else {
            src.reserve(LENGTH_PREFIX_END - src.len());
            return Ok(None);
        };
        let len = self.check_declared(declared)?;
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let chunk = src.split_to(len).freeze();
        tracing::trace!(chunk_len = len, buffered = src.len(), "chunk decoded");
        Ok(Some(chunk))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        match self.decode(src)? {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                let need = read_wire_u32_at(src, LENGTH_OFFSET)
                    .and_then(|declared| usize::try_from(declared).ok())
                    .unwrap_or(LENGTH_PREFIX_END);
                tracing::debug!(
                    bytes_received = src.len(),
                    need,
                    "stream closed inside a chunk"
                );
                Err(MalformedChunk::Truncated {
                    have: src.len(),
                    need,
                }
                .into())
            }
        }
    }
}

impl Encoder<Bytes> for ChunkCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        validate_chunk(&item)?;
        if item.len() > self.max_chunk_size {
            let declared = u32::try_from(item.len()).unwrap_or(u32::MAX);
            return Err(MalformedChunk::OversizedChunk {
                declared,
                max: self.max_chunk_size,
            }
            .into());
        }
        dst.extend_from_slice(&item);
        Ok(())
    }
}
