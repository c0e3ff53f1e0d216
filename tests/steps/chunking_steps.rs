//! Steps for chunk framing and reassembly behavioural tests.

use cucumber::{given, then, when};
use uaframe::ChunkType;

use crate::worlds::ChunkingWorld;

fn parse_chunk_type(marker: &str) -> ChunkType {
    match marker {
        "C" => ChunkType::Continuation,
        "F" => ChunkType::Final,
        "A" => ChunkType::Abort,
        other => panic!("unknown chunk marker {other}"),
    }
}

/// Parse a list such as `C10, C10, F5` into chunk types and body lengths.
fn parse_chunk_list(list: &str) -> Vec<(ChunkType, usize)> {
    list.split(',')
        .map(str::trim)
        .map(|entry| {
            let (marker, len) = entry.split_at(1);
            (
                parse_chunk_type(marker),
                len.parse().expect("body length is a number"),
            )
        })
        .collect()
}

#[given(expr = "a framer with message size {int}")]
fn given_framer(world: &mut ChunkingWorld, message_size: usize) {
    world.configure_framer(message_size);
}

#[when(expr = "{int} bytes of {int} are written")]
fn when_bytes_written(world: &mut ChunkingWorld, len: usize, byte: u8) { world.write(len, byte); }

#[when("the message is ended")]
fn when_message_ended(world: &mut ChunkingWorld) { world.end(); }

#[when("the message is aborted")]
fn when_message_aborted(world: &mut ChunkingWorld) { world.abort(); }

#[when("the chunks are delivered to the reassembler")]
fn when_chunks_delivered(world: &mut ChunkingWorld) { world.deliver_chunks(); }

#[when(expr = "a chunk declaring {int} bytes is delivered")]
fn when_corrupted_chunk(world: &mut ChunkingWorld, declared: u32) {
    world.deliver_corrupted_chunk(declared);
}

#[when(expr = "a chunk of type {string} is delivered")]
fn when_chunk_of_type(world: &mut ChunkingWorld, marker: String) {
    let byte = *marker.as_bytes().first().expect("non-empty marker");
    world.deliver_chunk_of_type(byte);
}

#[then(expr = "the framer emits {string}")]
fn then_framer_emits(world: &mut ChunkingWorld, list: String) {
    world.assert_chunks(&parse_chunk_list(&list));
}

#[then("the framer configuration is rejected")]
fn then_config_rejected(world: &mut ChunkingWorld) { world.assert_config_rejected(); }

#[then(expr = "the reassembler yields {int} bytes of {int}")]
fn then_reassembled(world: &mut ChunkingWorld, len: usize, byte: u8) {
    world.assert_completed(len, byte);
}

#[then(expr = "the reassembler reports an abort discarding {int} chunk(s)")]
fn then_aborted(world: &mut ChunkingWorld, chunks: usize) { world.assert_aborted(chunks); }

#[then("the chunk is rejected for its length")]
fn then_length_rejected(world: &mut ChunkingWorld) { world.assert_length_mismatch(); }

#[then(expr = "the chunk is rejected for chunk type {string}")]
fn then_type_rejected(world: &mut ChunkingWorld, marker: String) {
    let byte = *marker.as_bytes().first().expect("non-empty marker");
    world.assert_unknown_chunk_type(byte);
}

#[then(expr = "the reassembler holds {int} bytes")]
fn then_buffered(world: &mut ChunkingWorld, bytes: usize) { world.assert_buffered(bytes); }
