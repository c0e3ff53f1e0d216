//! Fixed-size block buffering for an unbounded stream of writes.
//!
//! [`BlockAccumulator`] collects bytes into blocks of a fixed capacity. Each
//! completed block is handed to a [`BlockObserver`], which is also told
//! immediately before a new block starts filling so it can pre-fill the
//! block's leading bytes. The observer is passed by mutable reference to every
//! call rather than stored, so notifications are delivered synchronously and
//! the observer can never re-enter the accumulator.

use std::num::NonZeroUsize;

use crate::chunk::InvalidArgument;

/// Receiver of block lifecycle notifications.
pub trait BlockObserver {
    /// Called once per block, just before the first byte is copied into it.
    ///
    /// `block` is the whole block buffer; the caller may pre-fill any prefix.
    fn before_block(&mut self, _block: &mut [u8]) {}

    /// Called with every completed block, and with the trailing partial block
    /// on [`BlockAccumulator::end`].
    fn block_ready(&mut self, block: &[u8]);
}

/// How the trailing partial block is completed on [`BlockAccumulator::end`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PaddingPolicy {
    /// Emit only the bytes written so far.
    #[default]
    None,
    /// Fill the unused tail with the given byte and emit a full block.
    Fill(u8),
}

/// Buffers writes into fixed-capacity blocks.
///
/// # Examples
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use uaframe::accumulator::{BlockAccumulator, BlockObserver};
///
/// #[derive(Default)]
/// struct Collect(Vec<Vec<u8>>);
///
/// impl BlockObserver for Collect {
///     fn block_ready(&mut self, block: &[u8]) { self.0.push(block.to_vec()); }
/// }
///
/// let mut acc = BlockAccumulator::new(NonZeroUsize::new(4).expect("non-zero"));
/// let mut out = Collect::default();
/// acc.write(b"abcdef", &mut out).expect("non-empty write");
/// acc.end(&mut out);
/// assert_eq!(out.0, vec![b"abcd".to_vec(), b"ef".to_vec()]);
/// ```
#[derive(Debug)]
pub struct BlockAccumulator {
    block: Vec<u8>,
    cursor: usize,
    padding: PaddingPolicy,
}

impl BlockAccumulator {
    /// Create an accumulator emitting blocks of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            block: vec![0; capacity.get()],
            cursor: 0,
            padding: PaddingPolicy::None,
        }
    }

    /// Set the policy applied to the trailing partial block.
    #[must_use]
    pub fn with_padding(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }

    /// Bytes written into the current, not yet emitted, block.
    #[must_use]
    pub fn buffered(&self) -> usize { self.cursor }

    /// Copy `bytes` into the block stream.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::EmptyWrite`] if `bytes` is empty. Nothing is
    /// notified in that case.
    pub fn write<O>(&mut self, bytes: &[u8], observer: &mut O) -> Result<(), InvalidArgument>
    where
        O: BlockObserver + ?Sized,
    {
        if bytes.is_empty() {
            return Err(InvalidArgument::EmptyWrite);
        }
        self.advance(bytes.len(), Some(bytes), observer);
        Ok(())
    }

    /// Advance the block stream by `len` bytes without copying input.
    ///
    /// Block notifications fire exactly as they would for a write of the same
    /// length. Reserved bytes keep whatever the observer stored during
    /// [`BlockObserver::before_block`] and are zero otherwise, which lets a
    /// caller pre-fill a block prefix and then step over it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::EmptyReserve`] if `len` is zero.
    pub fn reserve<O>(&mut self, len: usize, observer: &mut O) -> Result<(), InvalidArgument>
    where
        O: BlockObserver + ?Sized,
    {
        if len == 0 {
            return Err(InvalidArgument::EmptyReserve);
        }
        self.advance(len, None, observer);
        Ok(())
    }

    /// Flush the trailing partial block, if any.
    pub fn end<O>(&mut self, observer: &mut O)
    where
        O: BlockObserver + ?Sized,
    {
        if self.cursor == 0 {
            return;
        }
        match self.padding {
            PaddingPolicy::None => observer.block_ready(&self.block[..self.cursor]),
            PaddingPolicy::Fill(byte) => {
                self.block[self.cursor..].fill(byte);
                observer.block_ready(&self.block);
            }
        }
        self.cursor = 0;
    }

    /// Drop the trailing partial block without notifying anyone.
    pub fn discard(&mut self) { self.cursor = 0; }

    fn advance<O>(&mut self, len: usize, source: Option<&[u8]>, observer: &mut O)
    where
        O: BlockObserver + ?Sized,
    {
        let capacity = self.block.len();
        let mut consumed = 0;

        while consumed < len {
            if self.cursor == 0 {
                self.block.fill(0);
                observer.before_block(&mut self.block);
            }

            let count = (len - consumed).min(capacity - self.cursor);
            if let Some(bytes) = source {
                self.block[self.cursor..self.cursor + count]
                    .copy_from_slice(&bytes[consumed..consumed + count]);
            }

            consumed += count;
            self.cursor += count;
            if self.cursor == capacity {
                observer.block_ready(&self.block);
                self.cursor = 0;
            }
        }
    }
}
