#![doc(html_root_url = "https://docs.rs/uaframe/latest")]
//! Public API for the `uaframe` library.
//!
//! This crate implements the OPC UA message chunking layer: splitting an
//! outbound logical message into size-bounded chunks with correctly
//! finalised headers, and reassembling received chunks into complete
//! messages or reporting aborts.

pub mod accumulator;
pub mod byte_order;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod extension;
pub mod framer;
pub mod metrics;
pub mod reassembler;
pub mod sink;

#[cfg(test)]
mod test_helpers;

pub use accumulator::{BlockAccumulator, BlockObserver, PaddingPolicy};
pub use chunk::{
    COMMON_HEADER_LEN,
    ChunkHeader,
    ChunkType,
    ErrorPayload,
    InvalidArgument,
    MalformedChunk,
    MessageType,
    SecureChannelId,
    validate_chunk,
};
pub use codec::ChunkCodec;
pub use config::{FramerConfig, ReassemblyConfig, TransportLimits};
pub use extension::{
    HeaderExtensionReader,
    HeaderExtensionWriter,
    NoExtension,
    SequenceHeaderReader,
    SequenceHeaderWriter,
};
pub use framer::ChunkFramer;
pub use self::metrics::{
    CHUNKS_PROCESSED,
    CHUNKS_REJECTED,
    Direction,
    MESSAGES_ABORTED,
    MESSAGES_ASSEMBLED,
};
pub use reassembler::{
    AbortedMessage,
    AssembledMessage,
    Feed,
    MessageReassembler,
    ReassemblyError,
    ReassemblyState,
};
pub use sink::ChunkSink;
