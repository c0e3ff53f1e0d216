//! Destination for framed outbound chunks.

use bytes::Bytes;

/// Receives ready-to-transmit chunks in emission order.
///
/// Implemented for `Vec<Bytes>` and for any `FnMut(Bytes)` closure.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use uaframe::sink::ChunkSink;
///
/// let mut sizes = Vec::new();
/// let mut sink = |chunk: Bytes| sizes.push(chunk.len());
/// sink.emit(Bytes::from_static(b"MSGF"));
/// assert_eq!(sizes, vec![4]);
/// ```
pub trait ChunkSink {
    /// Accept ownership of one chunk.
    fn emit(&mut self, chunk: Bytes);
}

impl ChunkSink for Vec<Bytes> {
    fn emit(&mut self, chunk: Bytes) { self.push(chunk); }
}

impl<F> ChunkSink for F
where
    F: FnMut(Bytes),
{
    fn emit(&mut self, chunk: Bytes) { self(chunk); }
}
