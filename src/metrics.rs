//! Metric helpers for `uaframe`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

/// Name of the counter tracking framed chunks.
pub const CHUNKS_PROCESSED: &str = "uaframe_chunks_processed_total";
/// Name of the counter tracking reassembled messages.
pub const MESSAGES_ASSEMBLED: &str = "uaframe_messages_assembled_total";
/// Name of the counter tracking messages ended by an abort chunk.
pub const MESSAGES_ABORTED: &str = "uaframe_messages_aborted_total";
/// Name of the counter tracking rejected inbound chunks.
pub const CHUNKS_REJECTED: &str = "uaframe_chunks_rejected_total";

/// Direction of chunk processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Chunks received from a peer.
    Inbound,
    /// Chunks produced for a peer.
    Outbound,
}

impl Direction {
    /// Label value used for this direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a processed chunk for the given direction.
pub fn inc_chunks(direction: Direction) {
    #[cfg(feature = "metrics")]
    metrics::counter!(CHUNKS_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a completed message.
pub fn inc_assembled() {
    #[cfg(feature = "metrics")]
    metrics::counter!(MESSAGES_ASSEMBLED).increment(1);
}

/// Record a message ended by an abort chunk.
pub fn inc_aborted() {
    #[cfg(feature = "metrics")]
    metrics::counter!(MESSAGES_ABORTED).increment(1);
}

/// Record a rejected inbound chunk.
pub fn inc_rejected() {
    #[cfg(feature = "metrics")]
    metrics::counter!(CHUNKS_REJECTED).increment(1);
}
