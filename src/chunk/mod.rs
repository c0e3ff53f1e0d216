//! Chunk header primitives shared by the outbound and inbound paths.
//!
//! Every OPC UA chunk starts with the same twelve byte prefix: a three byte
//! message type, a one byte chunk type, the total chunk length and the secure
//! channel identifier. This module models that prefix, validates raw buffers
//! against it, and defines the error taxonomy used across the crate.

pub mod abort;
pub mod error;
pub mod header;
pub mod validate;

pub use abort::ErrorPayload;
pub use error::{InvalidArgument, MalformedChunk};
pub use header::{
    COMMON_HEADER_LEN,
    ChunkHeader,
    ChunkType,
    MessageType,
    SecureChannelId,
};
pub use validate::validate_chunk;
