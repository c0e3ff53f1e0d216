//! Inbound reassembly of chunks into complete logical messages.
//!
//! [`MessageReassembler`] consumes one validated chunk per call to
//! [`feed`](MessageReassembler::feed) and reports whether the message is
//! still in progress, complete, or aborted by the peer. Every check runs
//! before any state is touched, so a rejected chunk leaves the message in
//! progress exactly as it was. Body bytes are copied out of each chunk into
//! owned blocks; the caller may reuse its receive buffer immediately.

use bytes::{Bytes, BytesMut};

use crate::{
    chunk::{
        COMMON_HEADER_LEN,
        ChunkHeader,
        ChunkType,
        ErrorPayload,
        MalformedChunk,
        MessageType,
        SecureChannelId,
        validate_chunk,
    },
    config::ReassemblyConfig,
    extension::{HeaderExtensionReader, NoExtension},
    metrics::{self, Direction},
};

mod error;

pub use error::ReassemblyError;

/// Lifecycle of the message in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReassemblyState {
    /// No chunk of the next message has been accepted.
    #[default]
    Idle,
    /// At least one continuation chunk is buffered.
    Accumulating,
    /// The last message ended with a final chunk.
    Complete,
    /// The last message ended with an abort chunk.
    Aborted,
}

/// Outcome of feeding one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feed {
    /// The chunk was buffered; more chunks are expected.
    Incomplete,
    /// The chunk completed a message.
    Complete(AssembledMessage),
    /// The peer abandoned the message.
    Aborted(AbortedMessage),
}

/// Message body reassembled from its chunks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledMessage {
    message_type: MessageType,
    secure_channel_id: SecureChannelId,
    chunk_count: usize,
    payload: Bytes,
}

impl AssembledMessage {
    /// Message family shared by all chunks.
    #[must_use]
    pub const fn message_type(&self) -> MessageType { self.message_type }

    /// Secure channel shared by all chunks.
    #[must_use]
    pub const fn secure_channel_id(&self) -> SecureChannelId { self.secure_channel_id }

    /// Number of chunks the message arrived in.
    #[must_use]
    pub const fn chunk_count(&self) -> usize { self.chunk_count }

    /// Borrow the reassembled body.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Consume the message, returning the body.
    #[must_use]
    pub fn into_payload(self) -> Bytes { self.payload }
}

/// Message abandoned by the peer with an abort chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbortedMessage {
    message_type: MessageType,
    secure_channel_id: SecureChannelId,
    body: Bytes,
    discarded_chunks: usize,
    discarded_bytes: usize,
}

impl AbortedMessage {
    /// Message family of the abandoned message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType { self.message_type }

    /// Secure channel of the abandoned message.
    #[must_use]
    pub const fn secure_channel_id(&self) -> SecureChannelId { self.secure_channel_id }

    /// Raw body of the abort chunk.
    #[must_use]
    pub fn body(&self) -> &[u8] { &self.body }

    /// Continuation chunks dropped with the message.
    #[must_use]
    pub const fn discarded_chunks(&self) -> usize { self.discarded_chunks }

    /// Body bytes dropped with the message.
    #[must_use]
    pub const fn discarded_bytes(&self) -> usize { self.discarded_bytes }

    /// Decode the abort body as a status code and reason.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedChunk`] when the body is not a valid error payload.
    pub fn error_payload(&self) -> Result<ErrorPayload, MalformedChunk> {
        ErrorPayload::decode(&self.body)
    }
}

/// Type and channel of the message in progress.
#[derive(Clone, Copy, Debug)]
struct MessageKey {
    message_type: MessageType,
    secure_channel_id: SecureChannelId,
}

/// Stateful reassembler for one secure channel.
///
/// # Examples
///
/// ```
/// use uaframe::{
///     config::ReassemblyConfig,
///     reassembler::{Feed, MessageReassembler},
/// };
///
/// let mut reassembler = MessageReassembler::new(ReassemblyConfig::default());
/// let mut chunk = b"MSGF\x0f\x00\x00\x00\x07\x00\x00\x00".to_vec();
/// chunk.extend_from_slice(b"abc");
///
/// let Ok(Feed::Complete(message)) = reassembler.feed(&chunk) else {
///     panic!("single final chunk completes the message");
/// };
/// assert_eq!(message.payload(), b"abc");
/// ```
#[derive(Debug)]
pub struct MessageReassembler<R = NoExtension> {
    config: ReassemblyConfig,
    reader: Option<R>,
    state: ReassemblyState,
    key: Option<MessageKey>,
    blocks: Vec<Bytes>,
    buffered: usize,
}

impl MessageReassembler<NoExtension> {
    /// Create a reassembler for chunks without an extension header.
    #[must_use]
    pub fn new(config: ReassemblyConfig) -> Self { Self::build(config, None) }
}

impl<R: HeaderExtensionReader> MessageReassembler<R> {
    /// Create a reassembler that parses and verifies extension headers with
    /// `reader`.
    #[must_use]
    pub fn with_extension_reader(config: ReassemblyConfig, reader: R) -> Self {
        Self::build(config, Some(reader))
    }

    fn build(config: ReassemblyConfig, reader: Option<R>) -> Self {
        Self {
            config,
            reader,
            state: ReassemblyState::Idle,
            key: None,
            blocks: Vec::new(),
            buffered: 0,
        }
    }

    /// Accept one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::Malformed`] for structurally invalid chunks
    /// and the limit variants when the chunk would exceed a configured limit.
    /// The reassembler state is unchanged on error.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Feed, ReassemblyError> {
        match self.feed_inner(chunk) {
            Ok(feed) => Ok(feed),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    chunk_len = chunk.len(),
                    buffered_chunks = self.blocks.len(),
                    "inbound chunk rejected"
                );
                metrics::inc_rejected();
                Err(error)
            }
        }
    }

    fn feed_inner(&mut self, chunk: &[u8]) -> Result<Feed, ReassemblyError> {
        validate_chunk(chunk)?;
        let header = ChunkHeader::decode(chunk)?;
        assert_eq!(
            usize::try_from(header.chunk_len()).ok(),
            Some(chunk.len()),
            "validated chunk length must equal the buffer length"
        );

        self.check_message_key(&header)?;
        let after_header = &chunk[COMMON_HEADER_LEN..];
        let consumed = self.read_extension(&header, after_header)?;
        let body = &after_header[consumed..];

        if header.chunk_type() != ChunkType::Abort {
            self.check_limits(body.len())?;
        }
        if let Some(reader) = self.reader.as_mut() {
            reader.verify_chunk(&header, body)?;
        }

        metrics::inc_chunks(Direction::Inbound);
        tracing::trace!(
            message_type = %header.message_type(),
            chunk_type = %header.chunk_type(),
            chunk_len = header.chunk_len(),
            body_len = body.len(),
            "chunk accepted"
        );

        Ok(match header.chunk_type() {
            ChunkType::Continuation => {
                self.push_block(&header, body);
                self.state = ReassemblyState::Accumulating;
                Feed::Incomplete
            }
            ChunkType::Final => {
                self.push_block(&header, body);
                Feed::Complete(self.complete(&header))
            }
            ChunkType::Abort => Feed::Aborted(self.abort(&header, body)),
        })
    }

    fn read_extension(
        &mut self,
        header: &ChunkHeader,
        after_header: &[u8],
    ) -> Result<usize, MalformedChunk> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };
        let consumed = reader.read_extension(header, after_header)?;
        if consumed == 0 {
            return Err(MalformedChunk::ExtensionUnderConsumed);
        }
        if consumed > after_header.len() {
            return Err(MalformedChunk::ExtensionOverrun {
                consumed,
                available: after_header.len(),
            });
        }
        Ok(consumed)
    }

    fn check_message_key(&self, header: &ChunkHeader) -> Result<(), MalformedChunk> {
        let Some(key) = self.key else {
            return Ok(());
        };
        if key.message_type != header.message_type() {
            return Err(MalformedChunk::MessageTypeMismatch {
                expected: key.message_type,
                found: header.message_type(),
            });
        }
        if key.secure_channel_id != header.secure_channel_id() {
            return Err(MalformedChunk::ChannelMismatch {
                expected: key.secure_channel_id,
                found: header.secure_channel_id(),
            });
        }
        Ok(())
    }

    fn check_limits(&self, body_len: usize) -> Result<(), ReassemblyError> {
        let chunks = self.blocks.len().saturating_add(1);
        if let Some(limit) = self.config.max_chunk_count
            && chunks > limit.get()
        {
            return Err(ReassemblyError::TooManyChunks {
                attempted: chunks,
                limit: limit.get(),
            });
        }
        let bytes = self.buffered.saturating_add(body_len);
        if let Some(limit) = self.config.max_message_size
            && bytes > limit.get()
        {
            return Err(ReassemblyError::MessageTooLarge {
                attempted: bytes,
                limit: limit.get(),
            });
        }
        Ok(())
    }

    fn push_block(&mut self, header: &ChunkHeader, body: &[u8]) {
        if self.key.is_none() {
            self.key = Some(MessageKey {
                message_type: header.message_type(),
                secure_channel_id: header.secure_channel_id(),
            });
        }
        self.blocks.push(Bytes::copy_from_slice(body));
        self.buffered += body.len();
    }

    fn complete(&mut self, header: &ChunkHeader) -> AssembledMessage {
        let chunk_count = self.blocks.len();
        let payload = concatenate(std::mem::take(&mut self.blocks), self.buffered);
        assert_eq!(
            payload.len(),
            self.buffered,
            "assembled payload length must equal the running total"
        );
        tracing::debug!(
            message_type = %header.message_type(),
            chunks = chunk_count,
            bytes = payload.len(),
            "message assembled"
        );
        metrics::inc_assembled();
        self.finish(ReassemblyState::Complete);
        AssembledMessage {
            message_type: header.message_type(),
            secure_channel_id: header.secure_channel_id(),
            chunk_count,
            payload,
        }
    }

    fn abort(&mut self, header: &ChunkHeader, body: &[u8]) -> AbortedMessage {
        let aborted = AbortedMessage {
            message_type: header.message_type(),
            secure_channel_id: header.secure_channel_id(),
            body: Bytes::copy_from_slice(body),
            discarded_chunks: self.blocks.len(),
            discarded_bytes: self.buffered,
        };
        tracing::warn!(
            message_type = %header.message_type(),
            discarded_chunks = aborted.discarded_chunks,
            discarded_bytes = aborted.discarded_bytes,
            "message aborted by peer"
        );
        metrics::inc_aborted();
        self.blocks.clear();
        self.finish(ReassemblyState::Aborted);
        aborted
    }

    fn finish(&mut self, state: ReassemblyState) {
        self.state = state;
        self.key = None;
        self.buffered = 0;
    }

    /// Discard the message in progress and return to [`ReassemblyState::Idle`].
    pub fn reset(&mut self) {
        if !self.blocks.is_empty() {
            tracing::debug!(
                chunks = self.blocks.len(),
                bytes = self.buffered,
                "partial message discarded"
            );
        }
        self.blocks.clear();
        self.finish(ReassemblyState::Idle);
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ReassemblyState { self.state }

    /// Body bytes buffered for the message in progress.
    #[must_use]
    pub const fn buffered_len(&self) -> usize { self.buffered }

    /// Chunks buffered for the message in progress.
    #[must_use]
    pub fn buffered_chunks(&self) -> usize { self.blocks.len() }

    /// Limits in force.
    #[must_use]
    pub const fn config(&self) -> &ReassemblyConfig { &self.config }

    /// Borrow the extension reader, if one is configured.
    #[must_use]
    pub fn extension_reader(&self) -> Option<&R> { self.reader.as_ref() }
}

fn concatenate(mut blocks: Vec<Bytes>, total: usize) -> Bytes {
    if blocks.len() == 1 {
        return blocks.pop().unwrap_or_default();
    }
    let mut payload = BytesMut::with_capacity(total);
    for block in &blocks {
        payload.extend_from_slice(block);
    }
    payload.freeze()
}

#[cfg(test)]
mod tests;
