//! Error types for chunk framing and chunk validation.
//!
//! The taxonomy separates API misuse ([`InvalidArgument`]) from structurally
//! invalid input received from a peer ([`MalformedChunk`]). Violations of
//! invariants the crate maintains itself are not represented here; they abort
//! with a panic naming the broken invariant.

use std::io;

use thiserror::Error;

use super::{MessageType, SecureChannelId};

/// Misuse of the framing API.
///
/// These errors always indicate a programming error in the caller and are
/// never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidArgument {
    /// A write was issued with no bytes.
    #[error("write of zero bytes is not permitted")]
    EmptyWrite,

    /// A reservation was issued for zero bytes.
    #[error("reservation of zero bytes is not permitted")]
    EmptyReserve,

    /// The configured message size leaves no room for body bytes.
    #[error(
        "message size {message_size} leaves no room for a body after a {header_size} byte header"
    )]
    NoBodyCapacity {
        /// Configured total chunk size.
        message_size: usize,
        /// Common header plus extension header size.
        header_size: usize,
    },

    /// The configured extra header size differs from what the extension
    /// writer fills.
    #[error(
        "extra header size {configured} does not match the {required} bytes written by the \
         extension writer"
    )]
    ExtensionSizeMismatch {
        /// Extra header size in the framer configuration.
        configured: usize,
        /// Bytes the installed writer fills; zero without a writer.
        required: usize,
    },

    /// The configured message size cannot be expressed in the length field.
    #[error("message size {message_size} does not fit the 32-bit chunk length field")]
    MessageSizeOverflow {
        /// Configured total chunk size.
        message_size: usize,
    },

    /// A message type code was not three ASCII uppercase letters.
    #[error("message type must be three ASCII uppercase letters, got {0:?}")]
    InvalidMessageType(String),

    /// An abort payload does not fit into a single chunk body.
    #[error("abort payload of {len} bytes exceeds the chunk body capacity of {capacity} bytes")]
    AbortPayloadTooLarge {
        /// Encoded payload length.
        len: usize,
        /// Body capacity of one chunk.
        capacity: usize,
    },
}

/// Structural defects in a received chunk.
///
/// A malformed chunk is fatal to the logical message it belongs to. The
/// caller decides whether to tear down the secure channel; this layer offers
/// no resynchronisation primitive.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MalformedChunk {
    /// Fewer bytes are available than the structure requires.
    #[error("truncated chunk: have {have} bytes, need {need}")]
    Truncated {
        /// Bytes available.
        have: usize,
        /// Bytes required.
        need: usize,
    },

    /// The declared chunk length disagrees with the buffer length.
    #[error("chunk length mismatch: header declares {declared} bytes, buffer holds {actual}")]
    LengthMismatch {
        /// Length carried in the chunk header.
        declared: u32,
        /// Actual buffer length.
        actual: usize,
    },

    /// The declared chunk length is shorter than the common header.
    #[error("declared chunk length {declared} is shorter than the common header")]
    UndersizedChunk {
        /// Length carried in the chunk header.
        declared: u32,
    },

    /// The declared chunk length exceeds the negotiated maximum.
    #[error("declared chunk length {declared} exceeds the maximum of {max} bytes")]
    OversizedChunk {
        /// Length carried in the chunk header.
        declared: u32,
        /// Negotiated maximum chunk size.
        max: usize,
    },

    /// The chunk type byte is not `C`, `F` or `A`.
    #[error("unknown chunk type byte {0:#04x}")]
    UnknownChunkType(u8),

    /// The extension header reader consumed no bytes.
    #[error("extension header reader consumed no bytes")]
    ExtensionUnderConsumed,

    /// The extension header reader consumed more bytes than the chunk holds.
    #[error("extension header reader consumed {consumed} bytes, only {available} available")]
    ExtensionOverrun {
        /// Bytes the reader reported as consumed.
        consumed: usize,
        /// Bytes following the common header.
        available: usize,
    },

    /// A chunk carried a different message type than the message in progress.
    #[error("message type mismatch: expected {expected}, found {found}")]
    MessageTypeMismatch {
        /// Message type of the message being assembled.
        expected: MessageType,
        /// Message type carried by the chunk.
        found: MessageType,
    },

    /// A chunk carried a different secure channel than the message in progress.
    #[error("secure channel mismatch: expected {expected}, found {found}")]
    ChannelMismatch {
        /// Secure channel of the message being assembled.
        expected: SecureChannelId,
        /// Secure channel carried by the chunk.
        found: SecureChannelId,
    },

    /// A sequence number did not follow its predecessor.
    #[error("sequence number mismatch: expected {expected}, found {found}")]
    SequenceMismatch {
        /// Sequence number the reader expected.
        expected: u32,
        /// Sequence number carried by the chunk.
        found: u32,
    },

    /// An abort chunk body could not be decoded as an error payload.
    #[error("invalid abort payload: {0}")]
    InvalidAbortPayload(&'static str),

    /// A verification collaborator rejected the chunk.
    #[error("chunk rejected: {0}")]
    Rejected(String),
}

impl From<MalformedChunk> for io::Error {
    fn from(error: MalformedChunk) -> Self {
        let kind = match error {
            MalformedChunk::Truncated { .. } => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, error)
    }
}
