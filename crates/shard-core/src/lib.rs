//! Concurrent chunked gzip split/join pipeline.
//!
//! `shard` splits a file into fixed-size chunks, compresses each chunk into
//! its own gzip container file, and reassembles a byte-identical copy from
//! the chunk files no matter what order the workers finish in. One producer
//! (or reassembler) plus a pool of workers communicate only through bounded
//! queues and a shared error sink; the first failure anywhere raises a
//! fail-fast flag every thread observes.

pub mod codec;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod types;

pub use crate::core::{Drained, ErrorRecord, ErrorSink, ReassemblyBuffer};
pub use crate::error::ShardError;
pub use crate::pipeline::{
    discover_chunks, validate_chunk_set, ChunkPipeline, CompressStats, DecompressStats,
    PipelineOptions,
};
pub use crate::types::{
    chunk_file_name, chunk_file_pattern, Chunk, ChunkFileRef, Result, DEFAULT_CHUNK_SIZE,
};
