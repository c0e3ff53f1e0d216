//! Errors produced while reassembling inbound chunks.

use std::io;

use thiserror::Error;

use crate::chunk::MalformedChunk;

/// Reasons a chunk was rejected by a
/// [`MessageReassembler`](super::MessageReassembler).
///
/// A rejected chunk never changes the reassembler's state. Whether the
/// message in progress survives is the caller's decision; most callers
/// [`reset`](super::MessageReassembler::reset) and close the channel.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// The chunk is structurally invalid.
    #[error(transparent)]
    Malformed(#[from] MalformedChunk),

    /// Accepting the chunk would exceed the message size limit.
    #[error("message of {attempted} body bytes exceeds the limit of {limit}")]
    MessageTooLarge {
        /// Body bytes the message would hold after this chunk.
        attempted: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Accepting the chunk would exceed the chunk count limit.
    #[error("message of {attempted} chunks exceeds the limit of {limit}")]
    TooManyChunks {
        /// Chunks the message would hold after this chunk.
        attempted: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl From<ReassemblyError> for io::Error {
    fn from(error: ReassemblyError) -> Self {
        match error {
            ReassemblyError::Malformed(malformed) => malformed.into(),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
