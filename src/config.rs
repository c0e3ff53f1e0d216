//! Configuration for chunk framing and reassembly.
//!
//! [`TransportLimits`] mirrors the buffer and message limits exchanged in
//! the connection handshake and can be loaded from any serde format.
//! [`FramerConfig`] and [`ReassemblyConfig`] are derived from it, or built
//! directly when the limits are already known.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::{
    accumulator::PaddingPolicy,
    chunk::{COMMON_HEADER_LEN, InvalidArgument, MessageType, SecureChannelId},
};

/// Default send and receive buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: u32 = 65_535;

/// Smallest buffer size a peer may negotiate.
pub const MIN_BUFFER_SIZE: u32 = 8_192;

/// Buffer and message limits negotiated for one connection.
///
/// A zero `max_message_size` or `max_chunk_count` means "no limit".
///
/// # Examples
///
/// ```
/// use uaframe::config::TransportLimits;
///
/// let limits: TransportLimits =
///     serde_json::from_str(r#"{ "send_buffer_size": 16384 }"#).expect("valid limits");
/// assert_eq!(limits.send_buffer_size, 16_384);
/// assert_eq!(limits.receive_buffer_size, 65_535);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportLimits {
    /// Largest chunk this side accepts.
    pub receive_buffer_size: u32,
    /// Largest chunk this side sends.
    pub send_buffer_size: u32,
    /// Largest reassembled message body, zero for unlimited.
    pub max_message_size: u32,
    /// Largest number of chunks per message, zero for unlimited.
    pub max_chunk_count: u32,
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            receive_buffer_size: DEFAULT_BUFFER_SIZE,
            send_buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: 0,
            max_chunk_count: 0,
        }
    }
}

impl TransportLimits {
    /// Revise these limits against the peer's requested limits.
    ///
    /// Our send buffer may not exceed the peer's receive buffer and vice
    /// versa. Message and chunk limits keep the stricter non-zero value.
    /// Buffer sizes never drop below [`MIN_BUFFER_SIZE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use uaframe::config::TransportLimits;
    ///
    /// let ours = TransportLimits::default();
    /// let peer = TransportLimits {
    ///     receive_buffer_size: 16_384,
    ///     max_chunk_count: 8,
    ///     ..TransportLimits::default()
    /// };
    /// let revised = ours.negotiate(&peer);
    /// assert_eq!(revised.send_buffer_size, 16_384);
    /// assert_eq!(revised.max_chunk_count, 8);
    /// ```
    #[must_use]
    pub fn negotiate(&self, peer: &Self) -> Self {
        Self {
            receive_buffer_size: self
                .receive_buffer_size
                .min(peer.send_buffer_size)
                .max(MIN_BUFFER_SIZE),
            send_buffer_size: self
                .send_buffer_size
                .min(peer.receive_buffer_size)
                .max(MIN_BUFFER_SIZE),
            max_message_size: stricter_limit(self.max_message_size, peer.max_message_size),
            max_chunk_count: stricter_limit(self.max_chunk_count, peer.max_chunk_count),
        }
    }
}

fn stricter_limit(ours: u32, theirs: u32) -> u32 {
    match (ours, theirs) {
        (0, other) | (other, 0) => other,
        (a, b) => a.min(b),
    }
}

fn optional_limit(value: u32) -> Option<NonZeroUsize> {
    usize::try_from(value).ok().and_then(NonZeroUsize::new)
}

/// Settings for an outbound [`ChunkFramer`](crate::framer::ChunkFramer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramerConfig {
    message_size: usize,
    message_type: MessageType,
    secure_channel_id: SecureChannelId,
    extra_header_size: usize,
    padding: PaddingPolicy,
}

impl FramerConfig {
    /// Create a configuration producing chunks of at most `message_size`
    /// bytes, header included.
    #[must_use]
    pub const fn new(
        message_size: usize,
        message_type: MessageType,
        secure_channel_id: SecureChannelId,
    ) -> Self {
        Self {
            message_size,
            message_type,
            secure_channel_id,
            extra_header_size: 0,
            padding: PaddingPolicy::None,
        }
    }

    /// Create a configuration sized by the negotiated send buffer.
    #[must_use]
    pub fn from_limits(
        limits: &TransportLimits,
        message_type: MessageType,
        secure_channel_id: SecureChannelId,
    ) -> Self {
        let message_size = usize::try_from(limits.send_buffer_size).unwrap_or(usize::MAX);
        Self::new(message_size, message_type, secure_channel_id)
    }

    /// Reserve `extra_header_size` bytes after the common header.
    #[must_use]
    pub const fn with_extra_header_size(mut self, extra_header_size: usize) -> Self {
        self.extra_header_size = extra_header_size;
        self
    }

    /// Set the padding applied to the last body block of each message.
    #[must_use]
    pub const fn with_padding(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }

    /// Maximum total chunk size, header included.
    #[must_use]
    pub const fn message_size(&self) -> usize { self.message_size }

    /// Message family stamped on every chunk.
    #[must_use]
    pub const fn message_type(&self) -> MessageType { self.message_type }

    /// Secure channel stamped on every chunk.
    #[must_use]
    pub const fn secure_channel_id(&self) -> SecureChannelId { self.secure_channel_id }

    /// Bytes reserved for the extension header.
    #[must_use]
    pub const fn extra_header_size(&self) -> usize { self.extra_header_size }

    /// Padding applied to the trailing body block.
    #[must_use]
    pub const fn padding(&self) -> PaddingPolicy { self.padding }

    /// Common header plus extension header size.
    #[must_use]
    pub const fn header_size(&self) -> usize {
        COMMON_HEADER_LEN.saturating_add(self.extra_header_size)
    }

    /// Body bytes carried by a full chunk.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::MessageSizeOverflow`] when the message size
    /// does not fit the 32-bit length field and
    /// [`InvalidArgument::NoBodyCapacity`] when the header leaves no room for
    /// a body.
    pub fn body_capacity(&self) -> Result<NonZeroUsize, InvalidArgument> {
        if u32::try_from(self.message_size).is_err() {
            return Err(InvalidArgument::MessageSizeOverflow {
                message_size: self.message_size,
            });
        }
        self.message_size
            .checked_sub(self.header_size())
            .and_then(NonZeroUsize::new)
            .ok_or(InvalidArgument::NoBodyCapacity {
                message_size: self.message_size,
                header_size: self.header_size(),
            })
    }
}

/// Settings for an inbound [`MessageReassembler`](crate::reassembler::MessageReassembler).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReassemblyConfig {
    /// Cap on the reassembled body size, `None` for unlimited.
    pub max_message_size: Option<NonZeroUsize>,
    /// Cap on the number of chunks per message, `None` for unlimited.
    pub max_chunk_count: Option<NonZeroUsize>,
}

impl ReassemblyConfig {
    /// Apply the negotiated message and chunk limits.
    #[must_use]
    pub fn from_limits(limits: &TransportLimits) -> Self {
        Self {
            max_message_size: optional_limit(limits.max_message_size),
            max_chunk_count: optional_limit(limits.max_chunk_count),
        }
    }
}
