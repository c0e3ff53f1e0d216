//! Shared helpers for unit tests.

use bytes::Bytes;

use crate::{
    accumulator::BlockObserver,
    chunk::{COMMON_HEADER_LEN, ChunkHeader},
};

/// Build a raw chunk with a correct length field.
pub fn raw_chunk(message_type: &[u8; 3], chunk_type: u8, channel: u32, body: &[u8]) -> Vec<u8> {
    let len = u32::try_from(COMMON_HEADER_LEN + body.len()).expect("test chunk fits u32");
    let mut chunk = Vec::with_capacity(COMMON_HEADER_LEN + body.len());
    chunk.extend_from_slice(message_type);
    chunk.push(chunk_type);
    chunk.extend_from_slice(&len.to_le_bytes());
    chunk.extend_from_slice(&channel.to_le_bytes());
    chunk.extend_from_slice(body);
    chunk
}

/// Decode the header of an emitted chunk and return it with the body bytes.
pub fn split_chunk(chunk: &Bytes, header_size: usize) -> (ChunkHeader, &[u8]) {
    let header = ChunkHeader::decode(chunk).expect("emitted chunk header decodes");
    (header, &chunk[header_size..])
}

/// Observer that records every notification in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub events: Vec<ObservedEvent>,
}

/// One notification captured by [`RecordingObserver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObservedEvent {
    BeforeBlock,
    BlockReady(Vec<u8>),
}

impl RecordingObserver {
    pub fn blocks(&self) -> Vec<Vec<u8>> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ObservedEvent::BlockReady(block) => Some(block.clone()),
                ObservedEvent::BeforeBlock => None,
            })
            .collect()
    }

    pub fn before_block_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, ObservedEvent::BeforeBlock))
            .count()
    }
}

impl BlockObserver for RecordingObserver {
    fn before_block(&mut self, _block: &mut [u8]) { self.events.push(ObservedEvent::BeforeBlock); }

    fn block_ready(&mut self, block: &[u8]) {
        self.events.push(ObservedEvent::BlockReady(block.to_vec()));
    }
}
