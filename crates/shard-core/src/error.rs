use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no chunk files found matching {pattern}")]
    NoChunksFound { pattern: String },
    #[error("chunk {sequence} is missing from the discovered set")]
    MissingChunk { sequence: u64 },
    #[error("chunk {sequence} appears more than once in the discovered set")]
    DuplicateChunk { sequence: u64 },
    #[error("chunk file already exists, refusing to overwrite: {}", .path.display())]
    ChunkFileExists { path: PathBuf },
    #[error("path has no usable file name: {}", .path.display())]
    InvalidPath { path: PathBuf },
    #[error("compression error: {0}")]
    CompressionError(String),
    #[error("decompression error: {0}")]
    DecompressionError(String),
    #[error("worker thread panicked: {0}")]
    WorkerPanic(String),
}
