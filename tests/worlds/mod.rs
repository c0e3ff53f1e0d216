//! Test worlds shared by the Cucumber runner.

mod chunking;

pub use chunking::ChunkingWorld;
