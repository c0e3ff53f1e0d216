//! Outbound framer that splits a logical message into protocol chunks.
//!
//! [`ChunkFramer`] feeds writes through a [`BlockAccumulator`] sized to the
//! chunk body capacity. Each completed body block becomes a pending chunk;
//! the pending chunk is only flushed once the framer knows whether another
//! block follows (`C`), the message ended (`F`) or it was aborted (`A`), and
//! its header is written at that moment.

use std::num::NonZeroUsize;

use bytes::{Bytes, BytesMut};

use crate::{
    accumulator::{BlockAccumulator, BlockObserver},
    chunk::{COMMON_HEADER_LEN, ChunkHeader, ChunkType, ErrorPayload, InvalidArgument},
    config::FramerConfig,
    extension::{HeaderExtensionWriter, NoExtension},
    metrics::{self, Direction},
    sink::ChunkSink,
};

/// Byte pattern filling header regions until the header is finalised.
pub const HEADER_SENTINEL: u8 = 0xEF;

/// Splits an unbounded write stream into framed chunks.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use uaframe::{
///     chunk::{MessageType, SecureChannelId},
///     config::FramerConfig,
///     framer::ChunkFramer,
/// };
///
/// let config = FramerConfig::new(22, MessageType::MESSAGE, SecureChannelId::new(5));
/// let mut framer = ChunkFramer::new(config, Vec::<Bytes>::new()).expect("valid config");
/// framer.write(&[0x41; 25]).expect("non-empty write");
/// framer.end();
///
/// let chunks = framer.into_sink();
/// let markers: Vec<u8> = chunks.iter().map(|chunk| chunk[3]).collect();
/// assert_eq!(markers, b"CCF");
/// assert_eq!(chunks[2].len(), 12 + 5);
/// ```
#[derive(Debug)]
pub struct ChunkFramer<S, W = NoExtension> {
    body_capacity: NonZeroUsize,
    accumulator: BlockAccumulator,
    outbound: PendingChunk<S, W>,
}

impl<S: ChunkSink> ChunkFramer<S, NoExtension> {
    /// Create a framer delivering chunks to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] when the configuration leaves no room for
    /// body bytes or exceeds the length field, and
    /// [`InvalidArgument::ExtensionSizeMismatch`] when it reserves an extra
    /// header, which requires [`with_extension`](ChunkFramer::with_extension).
    pub fn new(config: FramerConfig, sink: S) -> Result<Self, InvalidArgument> {
        Self::build(config, sink, None)
    }
}

impl<S, W> ChunkFramer<S, W>
where
    S: ChunkSink,
    W: HeaderExtensionWriter,
{
    /// Create a framer whose extension header is filled by `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`] when the configuration leaves no room for
    /// body bytes or exceeds the length field, and
    /// [`InvalidArgument::ExtensionSizeMismatch`] when its extra header size
    /// differs from [`HeaderExtensionWriter::extension_len`].
    pub fn with_extension(
        config: FramerConfig,
        sink: S,
        writer: W,
    ) -> Result<Self, InvalidArgument> {
        Self::build(config, sink, Some(writer))
    }

    fn build(config: FramerConfig, sink: S, writer: Option<W>) -> Result<Self, InvalidArgument> {
        let required = writer.as_ref().map_or(0, HeaderExtensionWriter::extension_len);
        if config.extra_header_size() != required {
            return Err(InvalidArgument::ExtensionSizeMismatch {
                configured: config.extra_header_size(),
                required,
            });
        }
        let body_capacity = config.body_capacity()?;
        tracing::debug!(
            message_type = %config.message_type(),
            secure_channel_id = %config.secure_channel_id(),
            message_size = config.message_size(),
            body_capacity = body_capacity.get(),
            "chunk framer configured"
        );
        Ok(Self {
            body_capacity,
            accumulator: BlockAccumulator::new(body_capacity).with_padding(config.padding()),
            outbound: PendingChunk {
                config,
                pending: None,
                sink,
                writer,
                emitted: 0,
            },
        })
    }

    /// Append message bytes.
    ///
    /// Completed chunks are delivered to the sink before this call returns,
    /// except the most recent one, which stays pending.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::EmptyWrite`] when `bytes` is empty.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), InvalidArgument> {
        self.accumulator.write(bytes, &mut self.outbound)
    }

    /// Advance the body by `len` bytes without copying.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::EmptyReserve`] when `len` is zero.
    pub fn reserve(&mut self, len: usize) -> Result<(), InvalidArgument> {
        self.accumulator.reserve(len, &mut self.outbound)
    }

    /// Finish the message, flushing its last chunk marked final.
    ///
    /// A message with no body still produces one header-only final chunk.
    pub fn end(&mut self) { self.finish(ChunkType::Final); }

    /// Abandon the message, flushing its last chunk marked abort.
    ///
    /// Body bytes still buffered travel in the abort chunk; exactly one abort
    /// chunk is emitted and no final chunk follows.
    pub fn abort(&mut self) { self.finish(ChunkType::Abort); }

    /// Abandon the message with a diagnostic body.
    ///
    /// Buffered body bytes are discarded and a single abort chunk carrying
    /// the encoded `payload` is emitted.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::AbortPayloadTooLarge`] when the payload
    /// does not fit one chunk body. The message is left untouched.
    pub fn abort_with(&mut self, payload: &ErrorPayload) -> Result<(), InvalidArgument> {
        let capacity = self.body_capacity().get();
        if payload.encoded_len() > capacity {
            return Err(InvalidArgument::AbortPayloadTooLarge {
                len: payload.encoded_len(),
                capacity,
            });
        }
        self.accumulator.discard();
        self.outbound.pending = None;
        self.outbound.stage(&payload.encode());
        self.outbound.flush(ChunkType::Abort);
        self.outbound.reset_message(ChunkType::Abort);
        Ok(())
    }

    fn finish(&mut self, chunk_type: ChunkType) {
        self.accumulator.end(&mut self.outbound);
        if self.outbound.pending.is_none() {
            self.outbound.stage(&[]);
        }
        self.outbound.flush(chunk_type);
        self.outbound.reset_message(chunk_type);
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &FramerConfig { &self.outbound.config }

    /// Body bytes carried by a full chunk.
    #[must_use]
    pub const fn body_capacity(&self) -> NonZeroUsize { self.body_capacity }

    /// Whether a framed chunk is waiting to learn its chunk type.
    #[must_use]
    pub fn has_pending(&self) -> bool { self.outbound.pending.is_some() }

    /// Chunks emitted so far for the message in progress.
    #[must_use]
    pub fn emitted_in_message(&self) -> usize { self.outbound.emitted }

    /// Borrow the sink.
    #[must_use]
    pub fn sink(&self) -> &S { &self.outbound.sink }

    /// Consume the framer, returning the sink.
    ///
    /// A chunk still pending is dropped.
    #[must_use]
    pub fn into_sink(self) -> S { self.outbound.sink }
}

/// Single-slot pipeline between the accumulator and the sink.
#[derive(Debug)]
struct PendingChunk<S, W> {
    config: FramerConfig,
    pending: Option<BytesMut>,
    sink: S,
    writer: Option<W>,
    emitted: usize,
}

impl<S, W> PendingChunk<S, W>
where
    S: ChunkSink,
    W: HeaderExtensionWriter,
{
    fn stage(&mut self, body: &[u8]) {
        assert!(
            self.pending.is_none(),
            "at most one framed chunk may be pending"
        );
        let header_size = self.config.header_size();
        let total = header_size + body.len();
        assert!(
            total <= self.config.message_size(),
            "chunk of {total} bytes exceeds the configured message size of {}",
            self.config.message_size()
        );

        let mut chunk = BytesMut::with_capacity(total);
        chunk.resize(header_size, HEADER_SENTINEL);
        chunk.extend_from_slice(body);
        self.pending = Some(chunk);
    }

    fn flush(&mut self, chunk_type: ChunkType) {
        let Some(mut chunk) = self.pending.take() else {
            return;
        };
        let chunk_len = u32::try_from(chunk.len()).unwrap_or_else(|_| {
            panic!(
                "chunk of {} bytes exceeds the length field; message size was validated",
                chunk.len()
            )
        });
        let header = ChunkHeader::new(
            self.config.message_type(),
            chunk_type,
            chunk_len,
            self.config.secure_channel_id(),
        );

        let (head, body) = chunk.split_at_mut(self.config.header_size());
        head[..COMMON_HEADER_LEN].copy_from_slice(&header.to_bytes());
        if let Some(writer) = self.writer.as_mut() {
            writer.write_extension(&mut head[COMMON_HEADER_LEN..], &header, body);
        }

        self.emitted += 1;
        tracing::trace!(
            message_type = %header.message_type(),
            chunk_type = %chunk_type,
            chunk_len,
            index = self.emitted - 1,
            "chunk emitted"
        );
        metrics::inc_chunks(Direction::Outbound);
        self.sink.emit(Bytes::from(chunk));
    }

    fn reset_message(&mut self, chunk_type: ChunkType) {
        tracing::debug!(
            chunks = self.emitted,
            chunk_type = %chunk_type,
            "outbound message finished"
        );
        self.emitted = 0;
    }
}

impl<S, W> BlockObserver for PendingChunk<S, W>
where
    S: ChunkSink,
    W: HeaderExtensionWriter,
{
    fn before_block(&mut self, block: &mut [u8]) {
        if let Some(writer) = self.writer.as_mut() {
            writer.before_block(block);
        }
    }

    fn block_ready(&mut self, block: &[u8]) {
        // A new block proves the pending chunk was not the last one.
        self.flush(ChunkType::Continuation);
        self.stage(block);
    }
}
