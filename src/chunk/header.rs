//! Common chunk header model.
//!
//! The layout is fixed by the protocol:
//!
//! ```text
//! offset 0 : message type, 3 ASCII bytes
//! offset 3 : chunk type, 1 ASCII byte
//! offset 4 : total chunk length, u32 little-endian
//! offset 8 : secure channel id, u32 little-endian
//! ```

use std::{fmt, str::FromStr};

use derive_more::{Display, From, Into};

use super::{InvalidArgument, MalformedChunk};
use crate::byte_order::{read_wire_u32_at, write_wire_u32};

/// Length of the header prefix shared by every chunk.
pub const COMMON_HEADER_LEN: usize = 12;

/// Marker telling the receiver how a chunk relates to its logical message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkType {
    /// More chunks of the same message follow.
    Continuation,
    /// Last chunk of a successfully framed message.
    Final,
    /// Last chunk of a failed message; the body is diagnostic.
    Abort,
}

impl ChunkType {
    /// Return the ASCII byte carried on the wire.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Continuation => b'C',
            Self::Final => b'F',
            Self::Abort => b'A',
        }
    }

    /// Map a wire byte back to a chunk type.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'C' => Some(Self::Continuation),
            b'F' => Some(Self::Final),
            b'A' => Some(Self::Abort),
            _ => None,
        }
    }

    /// Whether the chunk ends its logical message.
    #[must_use]
    pub const fn is_terminal(self) -> bool { !matches!(self, Self::Continuation) }
}

impl TryFrom<u8> for ChunkType {
    type Error = MalformedChunk;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(MalformedChunk::UnknownChunkType(byte))
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", char::from(self.as_byte()))
    }
}

/// Three byte message family code, such as `HEL` or `MSG`.
///
/// # Examples
///
/// ```
/// use uaframe::chunk::MessageType;
///
/// let parsed: MessageType = "OPN".parse().expect("valid code");
/// assert_eq!(parsed, MessageType::OPEN);
/// assert!("msg".parse::<MessageType>().is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageType([u8; 3]);

impl MessageType {
    /// Client hello.
    pub const HELLO: Self = Self(*b"HEL");
    /// Server acknowledge.
    pub const ACKNOWLEDGE: Self = Self(*b"ACK");
    /// Transport error.
    pub const ERROR: Self = Self(*b"ERR");
    /// Reverse hello.
    pub const REVERSE_HELLO: Self = Self(*b"RHE");
    /// Open secure channel.
    pub const OPEN: Self = Self(*b"OPN");
    /// Close secure channel.
    pub const CLOSE: Self = Self(*b"CLO");
    /// Service message.
    pub const MESSAGE: Self = Self(*b"MSG");

    /// Wrap raw wire bytes without validation.
    ///
    /// Inbound chunks are carried through as received; use [`str::parse`]
    /// for codes coming from configuration.
    #[must_use]
    pub const fn from_wire(code: [u8; 3]) -> Self { Self(code) }

    /// Return the raw wire bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 3] { &self.0 }
}

impl FromStr for MessageType {
    type Err = InvalidArgument;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let bytes = <[u8; 3]>::try_from(code.as_bytes())
            .map_err(|_| InvalidArgument::InvalidMessageType(code.to_owned()))?;
        if !bytes.iter().all(u8::is_ascii_uppercase) {
            return Err(InvalidArgument::InvalidMessageType(code.to_owned()));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageType({self})")
    }
}

/// Identifier of the secure channel a chunk belongs to.
///
/// # Examples
///
/// ```
/// use uaframe::chunk::SecureChannelId;
/// let id = SecureChannelId::new(42);
/// assert_eq!(id.get(), 42);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, From, Into)]
#[display("{_0}")]
pub struct SecureChannelId(u32);

impl SecureChannelId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u32 { self.0 }
}

/// Decoded common header of a single chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    message_type: MessageType,
    chunk_type: ChunkType,
    chunk_len: u32,
    secure_channel_id: SecureChannelId,
}

impl ChunkHeader {
    /// Create a header.
    #[must_use]
    pub const fn new(
        message_type: MessageType,
        chunk_type: ChunkType,
        chunk_len: u32,
        secure_channel_id: SecureChannelId,
    ) -> Self {
        Self {
            message_type,
            chunk_type,
            chunk_len,
            secure_channel_id,
        }
    }

    /// Decode the common header at the start of `chunk`.
    ///
    /// Only the first [`COMMON_HEADER_LEN`] bytes are inspected; comparing the
    /// declared length with the buffer is the job of
    /// [`validate_chunk`](super::validate_chunk).
    ///
    /// # Errors
    ///
    /// Returns [`MalformedChunk::Truncated`] when fewer than twelve bytes are
    /// available and [`MalformedChunk::UnknownChunkType`] when the chunk type
    /// byte is not recognised.
    pub fn decode(chunk: &[u8]) -> Result<Self, MalformedChunk> {
        let (Some(prefix), Some(chunk_len), Some(channel)) = (
            chunk.get(..4),
            read_wire_u32_at(chunk, 4),
            read_wire_u32_at(chunk, 8),
        ) else {
            return Err(MalformedChunk::Truncated {
                have: chunk.len(),
                need: COMMON_HEADER_LEN,
            });
        };
        let message_type = MessageType::from_wire([prefix[0], prefix[1], prefix[2]]);
        let chunk_type = ChunkType::try_from(prefix[3])?;
        Ok(Self::new(
            message_type,
            chunk_type,
            chunk_len,
            SecureChannelId::new(channel),
        ))
    }

    /// Encode the header into its twelve byte wire form.
    ///
    /// # Examples
    ///
    /// ```
    /// use uaframe::chunk::{ChunkHeader, ChunkType, MessageType, SecureChannelId};
    ///
    /// let header = ChunkHeader::new(
    ///     MessageType::MESSAGE,
    ///     ChunkType::Final,
    ///     20,
    ///     SecureChannelId::new(1),
    /// );
    /// assert_eq!(&header.to_bytes()[..4], b"MSGF");
    /// ```
    #[must_use]
    pub fn to_bytes(&self) -> [u8; COMMON_HEADER_LEN] {
        let mut bytes = [0_u8; COMMON_HEADER_LEN];
        bytes[..3].copy_from_slice(self.message_type.as_bytes());
        bytes[3] = self.chunk_type.as_byte();
        bytes[4..8].copy_from_slice(&write_wire_u32(self.chunk_len));
        bytes[8..].copy_from_slice(&write_wire_u32(self.secure_channel_id.get()));
        bytes
    }

    /// Return the message family code.
    #[must_use]
    pub const fn message_type(&self) -> MessageType { self.message_type }

    /// Return the chunk type marker.
    #[must_use]
    pub const fn chunk_type(&self) -> ChunkType { self.chunk_type }

    /// Return the declared total chunk length, header included.
    #[must_use]
    pub const fn chunk_len(&self) -> u32 { self.chunk_len }

    /// Return the secure channel identifier.
    #[must_use]
    pub const fn secure_channel_id(&self) -> SecureChannelId { self.secure_channel_id }
}
