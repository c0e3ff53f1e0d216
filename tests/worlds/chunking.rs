//! Test world tracking a framer's output and a reassembler's verdicts.

use bytes::Bytes;
use cucumber::World;
use uaframe::{
    COMMON_HEADER_LEN,
    ChunkFramer,
    ChunkHeader,
    ChunkType,
    Feed,
    FramerConfig,
    InvalidArgument,
    MalformedChunk,
    MessageReassembler,
    MessageType,
    ReassemblyConfig,
    ReassemblyError,
    SecureChannelId,
};

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct ChunkingWorld {
    framer: Option<ChunkFramer<Vec<Bytes>>>,
    config_error: Option<InvalidArgument>,
    reassembler: MessageReassembler,
    outcomes: Vec<Result<Feed, ReassemblyError>>,
}

impl ChunkingWorld {
    fn new() -> Self {
        Self {
            framer: None,
            config_error: None,
            reassembler: MessageReassembler::new(ReassemblyConfig::default()),
            outcomes: Vec::new(),
        }
    }

    fn framer(&mut self) -> &mut ChunkFramer<Vec<Bytes>> {
        self.framer.as_mut().expect("framer not configured")
    }

    fn chunks(&self) -> &[Bytes] {
        self.framer
            .as_ref()
            .expect("framer not configured")
            .sink()
            .as_slice()
    }

    /// Configure a framer producing chunks of at most `message_size` bytes.
    pub fn configure_framer(&mut self, message_size: usize) {
        let config = FramerConfig::new(message_size, MessageType::MESSAGE, SecureChannelId::new(1));
        match ChunkFramer::new(config, Vec::new()) {
            Ok(framer) => {
                self.framer = Some(framer);
                self.config_error = None;
            }
            Err(err) => {
                self.framer = None;
                self.config_error = Some(err);
            }
        }
    }

    /// Write `len` copies of `byte` to the framer.
    pub fn write(&mut self, len: usize, byte: u8) {
        self.framer()
            .write(&vec![byte; len])
            .expect("write accepted");
    }

    /// Finish the message in progress.
    pub fn end(&mut self) { self.framer().end(); }

    /// Abort the message in progress.
    pub fn abort(&mut self) { self.framer().abort(); }

    /// Feed every emitted chunk to the reassembler.
    pub fn deliver_chunks(&mut self) {
        let chunks = self.chunks().to_vec();
        for chunk in chunks {
            let outcome = self.reassembler.feed(&chunk);
            self.outcomes.push(outcome);
        }
    }

    /// Feed a hand-built chunk whose length field is corrupted.
    pub fn deliver_corrupted_chunk(&mut self, declared: u32) {
        let mut chunk = b"MSGC".to_vec();
        chunk.extend_from_slice(&declared.to_le_bytes());
        chunk.extend_from_slice(&1_u32.to_le_bytes());
        chunk.extend_from_slice(b"body");
        let outcome = self.reassembler.feed(&chunk);
        self.outcomes.push(outcome);
    }

    /// Feed a chunk carrying `chunk_type` as its type byte.
    pub fn deliver_chunk_of_type(&mut self, chunk_type: u8) {
        let mut chunk = b"MSG".to_vec();
        chunk.push(chunk_type);
        chunk.extend_from_slice(&12_u32.to_le_bytes());
        chunk.extend_from_slice(&1_u32.to_le_bytes());
        let outcome = self.reassembler.feed(&chunk);
        self.outcomes.push(outcome);
    }

    /// Assert the chunk type and body length of every emitted chunk.
    pub fn assert_chunks(&self, expected: &[(ChunkType, usize)]) {
        let actual: Vec<(ChunkType, usize)> = self
            .chunks()
            .iter()
            .map(|chunk| {
                let header = ChunkHeader::decode(chunk).expect("emitted header decodes");
                assert_eq!(header.chunk_len() as usize, chunk.len());
                (header.chunk_type(), chunk.len() - COMMON_HEADER_LEN)
            })
            .collect();
        assert_eq!(actual, expected);
    }

    /// Assert the framer configuration was rejected.
    pub fn assert_config_rejected(&self) {
        assert!(
            matches!(
                self.config_error,
                Some(InvalidArgument::NoBodyCapacity { .. })
            ),
            "expected a rejected configuration, got {:?}",
            self.config_error
        );
    }

    /// Assert the last outcome completed a message of `len` bytes of `byte`.
    pub fn assert_completed(&self, len: usize, byte: u8) {
        match self.outcomes.last() {
            Some(Ok(Feed::Complete(message))) => {
                assert_eq!(message.payload(), vec![byte; len].as_slice());
            }
            other => panic!("expected a completed message, got {other:?}"),
        }
    }

    /// Assert the last outcome was an abort discarding `chunks` chunks.
    pub fn assert_aborted(&self, chunks: usize) {
        match self.outcomes.last() {
            Some(Ok(Feed::Aborted(aborted))) => {
                assert_eq!(aborted.discarded_chunks(), chunks);
            }
            other => panic!("expected an aborted message, got {other:?}"),
        }
    }

    /// Assert the last outcome rejected a length mismatch.
    pub fn assert_length_mismatch(&self) {
        assert!(
            matches!(
                self.outcomes.last(),
                Some(Err(ReassemblyError::Malformed(
                    MalformedChunk::LengthMismatch { .. }
                )))
            ),
            "expected a length mismatch, got {:?}",
            self.outcomes.last()
        );
    }

    /// Assert the last outcome rejected an unknown chunk type.
    pub fn assert_unknown_chunk_type(&self, chunk_type: u8) {
        assert_eq!(
            self.outcomes.last(),
            Some(&Err(ReassemblyError::Malformed(
                MalformedChunk::UnknownChunkType(chunk_type)
            )))
        );
    }

    /// Assert how many body bytes the reassembler still holds.
    pub fn assert_buffered(&self, bytes: usize) {
        assert_eq!(self.reassembler.buffered_len(), bytes);
    }
}
