//! Unit tests for inbound message reassembly.

use std::num::NonZeroUsize;

use rstest::{fixture, rstest};
use tracing_test::traced_test;

use super::{AssembledMessage, Feed, MessageReassembler, ReassemblyError, ReassemblyState};
use crate::{
    chunk::{ChunkHeader, ErrorPayload, MalformedChunk, MessageType, SecureChannelId},
    config::ReassemblyConfig,
    extension::{HeaderExtensionReader, SequenceHeaderReader},
    test_helpers::raw_chunk,
};

#[fixture]
fn reassembler() -> MessageReassembler { MessageReassembler::new(ReassemblyConfig::default()) }

fn limited(max_message_size: usize, max_chunk_count: usize) -> MessageReassembler {
    MessageReassembler::new(ReassemblyConfig {
        max_message_size: NonZeroUsize::new(max_message_size),
        max_chunk_count: NonZeroUsize::new(max_chunk_count),
    })
}

fn expect_complete(feed: Result<Feed, ReassemblyError>) -> AssembledMessage {
    match feed {
        Ok(Feed::Complete(message)) => message,
        other => panic!("expected a complete message, got {other:?}"),
    }
}

#[rstest]
fn continuation_chunks_are_buffered_until_final(mut reassembler: MessageReassembler) {
    assert_eq!(
        reassembler.feed(&raw_chunk(b"MSG", b'C', 4, b"hello ")),
        Ok(Feed::Incomplete)
    );
    assert_eq!(reassembler.state(), ReassemblyState::Accumulating);
    assert_eq!(reassembler.buffered_len(), 6);
    assert_eq!(reassembler.buffered_chunks(), 1);

    let message = expect_complete(reassembler.feed(&raw_chunk(b"MSG", b'F', 4, b"world")));
    assert_eq!(message.payload(), b"hello world");
    assert_eq!(message.chunk_count(), 2);
    assert_eq!(message.message_type(), MessageType::MESSAGE);
    assert_eq!(message.secure_channel_id(), SecureChannelId::new(4));
    assert_eq!(reassembler.state(), ReassemblyState::Complete);
    assert_eq!(reassembler.buffered_len(), 0);
}

#[rstest]
fn header_only_final_chunk_yields_empty_message(mut reassembler: MessageReassembler) {
    let message = expect_complete(reassembler.feed(&raw_chunk(b"MSG", b'F', 1, &[])));
    assert!(message.payload().is_empty());
    assert_eq!(message.chunk_count(), 1);
}

#[rstest]
fn received_bytes_are_copied_out_of_the_caller_buffer(mut reassembler: MessageReassembler) {
    let mut buffer = raw_chunk(b"MSG", b'C', 1, b"abc");
    reassembler.feed(&buffer).expect("chunk accepted");
    buffer.fill(0);
    buffer = raw_chunk(b"MSG", b'F', 1, b"def");
    let message = expect_complete(reassembler.feed(&buffer));
    assert_eq!(message.payload(), b"abcdef");
}

#[rstest]
fn abort_discards_buffered_blocks(mut reassembler: MessageReassembler) {
    reassembler
        .feed(&raw_chunk(b"MSG", b'C', 2, &[1; 10]))
        .expect("chunk accepted");
    let payload = ErrorPayload::new(0x800D_0000, Some("cancelled".to_owned()));
    let feed = reassembler
        .feed(&raw_chunk(b"MSG", b'A', 2, &payload.encode()))
        .expect("abort accepted");

    let Feed::Aborted(aborted) = feed else {
        panic!("expected an aborted message, got {feed:?}");
    };
    assert_eq!(aborted.discarded_chunks(), 1);
    assert_eq!(aborted.discarded_bytes(), 10);
    assert_eq!(aborted.error_payload(), Ok(payload));
    assert_eq!(reassembler.state(), ReassemblyState::Aborted);
    assert_eq!(reassembler.buffered_chunks(), 0);

    let message = expect_complete(reassembler.feed(&raw_chunk(b"MSG", b'F', 2, b"next")));
    assert_eq!(message.payload(), b"next");
}

#[rstest]
fn header_only_abort_has_no_error_payload(mut reassembler: MessageReassembler) {
    let Ok(Feed::Aborted(aborted)) = reassembler.feed(&raw_chunk(b"MSG", b'A', 2, &[])) else {
        panic!("header-only abort accepted");
    };
    assert!(aborted.body().is_empty());
    assert!(matches!(
        aborted.error_payload(),
        Err(MalformedChunk::Truncated { have: 0, need: 8 })
    ));
}

#[rstest]
fn length_mismatch_is_rejected_without_state_change(mut reassembler: MessageReassembler) {
    reassembler
        .feed(&raw_chunk(b"MSG", b'C', 1, b"keep"))
        .expect("chunk accepted");

    let mut bad = raw_chunk(b"MSG", b'F', 1, b"tail");
    bad[4..8].copy_from_slice(&99_u32.to_le_bytes());
    assert_eq!(
        reassembler.feed(&bad),
        Err(ReassemblyError::Malformed(MalformedChunk::LengthMismatch {
            declared: 99,
            actual: 16,
        }))
    );
    assert_eq!(reassembler.state(), ReassemblyState::Accumulating);
    assert_eq!(reassembler.buffered_len(), 4);

    let message = expect_complete(reassembler.feed(&raw_chunk(b"MSG", b'F', 1, b"!")));
    assert_eq!(message.payload(), b"keep!");
}

#[rstest]
fn unknown_chunk_type_is_rejected(mut reassembler: MessageReassembler) {
    assert_eq!(
        reassembler.feed(&raw_chunk(b"MSG", b'X', 1, b"body")),
        Err(ReassemblyError::Malformed(MalformedChunk::UnknownChunkType(
            b'X'
        )))
    );
    assert_eq!(reassembler.state(), ReassemblyState::Idle);
}

#[rstest]
fn truncated_buffer_is_rejected(mut reassembler: MessageReassembler) {
    assert_eq!(
        reassembler.feed(b"MSGF\x08\x00\x00\x00"),
        Err(ReassemblyError::Malformed(MalformedChunk::Truncated {
            have: 8,
            need: 12,
        }))
    );
}

#[rstest]
#[case::message_type(b"OPN", 1, MalformedChunk::MessageTypeMismatch {
    expected: MessageType::MESSAGE,
    found: MessageType::OPEN,
})]
#[case::channel(b"MSG", 9, MalformedChunk::ChannelMismatch {
    expected: SecureChannelId::new(1),
    found: SecureChannelId::new(9),
})]
fn chunks_of_one_message_must_agree(
    mut reassembler: MessageReassembler,
    #[case] message_type: &[u8; 3],
    #[case] channel: u32,
    #[case] expected: MalformedChunk,
) {
    reassembler
        .feed(&raw_chunk(b"MSG", b'C', 1, b"a"))
        .expect("chunk accepted");
    assert_eq!(
        reassembler.feed(&raw_chunk(message_type, b'F', channel, b"b")),
        Err(ReassemblyError::Malformed(expected))
    );
    assert_eq!(reassembler.buffered_chunks(), 1);
}

#[test]
fn message_size_limit_rejects_overflowing_chunk() {
    let mut reassembler = limited(8, 0);
    reassembler
        .feed(&raw_chunk(b"MSG", b'C', 1, &[0; 6]))
        .expect("chunk accepted");
    assert_eq!(
        reassembler.feed(&raw_chunk(b"MSG", b'F', 1, &[0; 3])),
        Err(ReassemblyError::MessageTooLarge {
            attempted: 9,
            limit: 8,
        })
    );
    assert_eq!(reassembler.buffered_len(), 6);

    reassembler.reset();
    assert_eq!(reassembler.state(), ReassemblyState::Idle);
    assert_eq!(reassembler.buffered_len(), 0);
}

#[test]
fn chunk_count_limit_rejects_extra_chunk() {
    let mut reassembler = limited(0, 2);
    for _ in 0..2 {
        reassembler
            .feed(&raw_chunk(b"MSG", b'C', 1, b"x"))
            .expect("chunk accepted");
    }
    assert_eq!(
        reassembler.feed(&raw_chunk(b"MSG", b'F', 1, b"x")),
        Err(ReassemblyError::TooManyChunks {
            attempted: 3,
            limit: 2,
        })
    );
}

#[test]
fn abort_is_accepted_even_at_the_limits() {
    let mut reassembler = limited(4, 1);
    reassembler
        .feed(&raw_chunk(b"MSG", b'C', 1, b"full"))
        .expect("chunk accepted");
    assert!(matches!(
        reassembler.feed(&raw_chunk(b"MSG", b'A', 1, &[0; 8])),
        Ok(Feed::Aborted(_))
    ));
}

fn sequenced_chunk(chunk_type: u8, sequence: u32, body: &[u8]) -> Vec<u8> {
    request_chunk(1, chunk_type, sequence, 3, body)
}

fn request_chunk(
    channel: u32,
    chunk_type: u8,
    sequence: u32,
    request_id: u32,
    body: &[u8],
) -> Vec<u8> {
    let mut after_header = Vec::new();
    after_header.extend_from_slice(&sequence.to_le_bytes());
    after_header.extend_from_slice(&request_id.to_le_bytes());
    after_header.extend_from_slice(body);
    raw_chunk(b"MSG", chunk_type, channel, &after_header)
}

#[test]
fn sequence_header_is_stripped_and_checked() {
    let mut reassembler = MessageReassembler::with_extension_reader(
        ReassemblyConfig::default(),
        SequenceHeaderReader::new(),
    );
    reassembler
        .feed(&sequenced_chunk(b'C', 10, b"ab"))
        .expect("chunk accepted");
    assert_eq!(
        reassembler.feed(&sequenced_chunk(b'F', 12, b"cd")),
        Err(ReassemblyError::Malformed(MalformedChunk::SequenceMismatch {
            expected: 11,
            found: 12,
        }))
    );

    let message = expect_complete(reassembler.feed(&sequenced_chunk(b'F', 11, b"cd")));
    assert_eq!(message.payload(), b"abcd");
    assert_eq!(
        reassembler
            .extension_reader()
            .and_then(SequenceHeaderReader::last_request_id),
        Some(3)
    );
}

#[rstest]
#[case::other_channel(
    request_chunk(2, b'F', 11, 20, b"cd"),
    ReassemblyError::Malformed(MalformedChunk::ChannelMismatch {
        expected: SecureChannelId::new(1),
        found: SecureChannelId::new(2),
    })
)]
#[case::chunk_limit(
    request_chunk(1, b'F', 11, 20, b"cd"),
    ReassemblyError::TooManyChunks { attempted: 2, limit: 1 }
)]
fn rejected_chunk_leaves_sequence_state_untouched(
    #[case] rejected: Vec<u8>,
    #[case] expected: ReassemblyError,
) {
    let config = ReassemblyConfig {
        max_message_size: None,
        max_chunk_count: NonZeroUsize::new(1),
    };
    let mut reassembler =
        MessageReassembler::with_extension_reader(config, SequenceHeaderReader::new());
    reassembler
        .feed(&sequenced_chunk(b'C', 10, b"ab"))
        .expect("chunk accepted");

    assert_eq!(reassembler.feed(&rejected), Err(expected));
    assert_eq!(
        reassembler
            .extension_reader()
            .and_then(SequenceHeaderReader::last_request_id),
        Some(3)
    );

    reassembler.reset();
    reassembler
        .feed(&sequenced_chunk(b'C', 11, b"ef"))
        .expect("sequence continues after the rejection");
}

/// Reader reporting a fixed consumed length.
struct FixedReader(usize);

impl HeaderExtensionReader for FixedReader {
    fn read_extension(
        &mut self,
        _header: &ChunkHeader,
        _after_header: &[u8],
    ) -> Result<usize, MalformedChunk> {
        Ok(self.0)
    }
}

#[rstest]
#[case::nothing_consumed(0, MalformedChunk::ExtensionUnderConsumed)]
#[case::past_the_end(5, MalformedChunk::ExtensionOverrun { consumed: 5, available: 4 })]
fn extension_reader_must_consume_part_of_the_chunk(
    #[case] consumed: usize,
    #[case] expected: MalformedChunk,
) {
    let mut reassembler =
        MessageReassembler::with_extension_reader(ReassemblyConfig::default(), FixedReader(consumed));
    assert_eq!(
        reassembler.feed(&raw_chunk(b"MSG", b'F', 1, b"abcd")),
        Err(ReassemblyError::Malformed(expected))
    );
}

#[test]
fn extension_reader_may_consume_every_byte() {
    let mut reassembler =
        MessageReassembler::with_extension_reader(ReassemblyConfig::default(), FixedReader(4));
    let message = expect_complete(reassembler.feed(&raw_chunk(b"MSG", b'F', 1, b"abcd")));
    assert!(message.payload().is_empty());
}

#[traced_test]
#[test]
fn rejected_chunk_is_logged() {
    let mut reassembler = MessageReassembler::new(ReassemblyConfig::default());
    let _ = reassembler.feed(&raw_chunk(b"MSG", b'Q', 1, &[]));
    assert!(logs_contain("inbound chunk rejected"));
}

#[traced_test]
#[test]
fn abort_is_logged() {
    let mut reassembler = MessageReassembler::new(ReassemblyConfig::default());
    let _ = reassembler.feed(&raw_chunk(b"MSG", b'A', 1, &[]));
    assert!(logs_contain("message aborted by peer"));
}
