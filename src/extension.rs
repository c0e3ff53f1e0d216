//! Collaborator hooks for policy-specific header extensions.
//!
//! Security policies place extra fields (security tokens, sequence numbers,
//! request identifiers) between the common header and the chunk body. The
//! framing layer reserves room for them and calls these hooks, but never
//! interprets the fields itself.
//!
//! [`SequenceHeaderWriter`] and [`SequenceHeaderReader`] implement the eight
//! byte sequence header (sequence number followed by request id) used by
//! secure conversation messages.

use crate::{
    byte_order::{read_wire_u32_at, write_wire_u32},
    chunk::{ChunkHeader, MalformedChunk},
};

/// Fills the extension region of outbound chunks.
pub trait HeaderExtensionWriter {
    /// Size of the extension region this writer fills completely.
    ///
    /// The framer refuses a configuration whose extra header size differs.
    fn extension_len(&self) -> usize;

    /// Pass-through of the accumulator's `before_block` notification.
    ///
    /// `block` is the body block about to be filled.
    fn before_block(&mut self, _block: &mut [u8]) {}

    /// Populate the extension region of a chunk being flushed.
    ///
    /// `extension` is exactly the configured extension size. `header` is the
    /// finalised common header and `body` the chunk body.
    fn write_extension(&mut self, extension: &mut [u8], header: &ChunkHeader, body: &[u8]);
}

/// Parses and verifies the extension region of inbound chunks.
pub trait HeaderExtensionReader {
    /// Parse the extension fields at the start of `after_header`.
    ///
    /// Returns the number of bytes consumed; body bytes start immediately
    /// after them.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedChunk`] when the extension cannot be parsed.
    fn read_extension(
        &mut self,
        header: &ChunkHeader,
        after_header: &[u8],
    ) -> Result<usize, MalformedChunk>;

    /// Verify a chunk before its body is accepted.
    ///
    /// A chunk may be rejected after [`read_extension`](Self::read_extension)
    /// returns, so state describing accepted chunks is committed here.
    /// Sequence checks, signature verification and decryption belong here.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedChunk`] to reject the chunk.
    fn verify_chunk(&mut self, _header: &ChunkHeader, _body: &[u8]) -> Result<(), MalformedChunk> {
        Ok(())
    }
}

/// Placeholder used when no extension is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExtension;

impl HeaderExtensionWriter for NoExtension {
    fn extension_len(&self) -> usize { 0 }

    fn write_extension(&mut self, _extension: &mut [u8], _header: &ChunkHeader, _body: &[u8]) {}
}

impl HeaderExtensionReader for NoExtension {
    fn read_extension(
        &mut self,
        _header: &ChunkHeader,
        _after_header: &[u8],
    ) -> Result<usize, MalformedChunk> {
        Ok(0)
    }
}

/// Size of the sequence header in bytes.
pub const SEQUENCE_HEADER_LEN: usize = 8;

/// Writes a sequence number and request id into each outbound chunk.
///
/// Sequence numbers increase by one per chunk across messages; the request
/// id is fixed per logical message and is changed with
/// [`set_request_id`](Self::set_request_id).
#[derive(Clone, Debug)]
pub struct SequenceHeaderWriter {
    next_sequence_number: u32,
    request_id: u32,
}

impl SequenceHeaderWriter {
    /// Start numbering chunks at `first_sequence_number`.
    #[must_use]
    pub const fn new(first_sequence_number: u32, request_id: u32) -> Self {
        Self {
            next_sequence_number: first_sequence_number,
            request_id,
        }
    }

    /// Set the request id stamped on subsequent chunks.
    pub fn set_request_id(&mut self, request_id: u32) { self.request_id = request_id; }

    /// Sequence number the next chunk will carry.
    #[must_use]
    pub const fn next_sequence_number(&self) -> u32 { self.next_sequence_number }
}

impl HeaderExtensionWriter for SequenceHeaderWriter {
    fn extension_len(&self) -> usize { SEQUENCE_HEADER_LEN }

    fn write_extension(&mut self, extension: &mut [u8], _header: &ChunkHeader, _body: &[u8]) {
        assert_eq!(
            extension.len(),
            SEQUENCE_HEADER_LEN,
            "framer must size the extension region to the sequence header"
        );
        extension[..4].copy_from_slice(&write_wire_u32(self.next_sequence_number));
        extension[4..SEQUENCE_HEADER_LEN].copy_from_slice(&write_wire_u32(self.request_id));
        self.next_sequence_number = self.next_sequence_number.wrapping_add(1);
    }
}

/// Reads the sequence header and requires consecutive sequence numbers.
#[derive(Clone, Debug, Default)]
pub struct SequenceHeaderReader {
    expected: Option<u32>,
    parsed: Option<(u32, u32)>,
    last_request_id: Option<u32>,
}

impl SequenceHeaderReader {
    /// Create a reader that accepts any first sequence number.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            expected: None,
            parsed: None,
            last_request_id: None,
        }
    }

    /// Request id carried by the most recently accepted chunk.
    #[must_use]
    pub const fn last_request_id(&self) -> Option<u32> { self.last_request_id }
}

impl HeaderExtensionReader for SequenceHeaderReader {
    fn read_extension(
        &mut self,
        _header: &ChunkHeader,
        after_header: &[u8],
    ) -> Result<usize, MalformedChunk> {
        let (Some(sequence_number), Some(request_id)) = (
            read_wire_u32_at(after_header, 0),
            read_wire_u32_at(after_header, 4),
        ) else {
            return Err(MalformedChunk::Truncated {
                have: after_header.len(),
                need: SEQUENCE_HEADER_LEN,
            });
        };
        self.parsed = Some((sequence_number, request_id));
        Ok(SEQUENCE_HEADER_LEN)
    }

    fn verify_chunk(&mut self, _header: &ChunkHeader, _body: &[u8]) -> Result<(), MalformedChunk> {
        let Some((found, request_id)) = self.parsed.take() else {
            return Err(MalformedChunk::Rejected(
                "sequence header was not parsed".to_owned(),
            ));
        };
        match self.expected {
            Some(expected) if expected != found => {
                return Err(MalformedChunk::SequenceMismatch { expected, found });
            }
            _ => {}
        }
        self.expected = Some(found.wrapping_add(1));
        self.last_request_id = Some(request_id);
        Ok(())
    }
}
