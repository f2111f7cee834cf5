//! Compress/decompress pipeline orchestration.
//!
//! Each invocation builds its run state fresh (queues, sink, buffer),
//! spawns a fixed set of named threads, joins all of them unconditionally,
//! and only then folds the error sink into the run result.

mod compress;
mod decompress;
pub mod discover;

use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::core::sink::ErrorSink;
use crate::error::ShardError;
use crate::types::{Result, DEFAULT_CHUNK_SIZE};

pub use self::discover::{discover_chunks, validate_chunk_set};

/// Tunables for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Fixed chunk payload size read from the input file.
    pub chunk_size: usize,
    /// Soft capacity of the producer-to-worker chunk queue.
    pub queue_capacity: usize,
    /// Soft capacity of the ordered reassembly buffer.
    pub reassembly_capacity: usize,
    /// Worker pool size.
    pub num_workers: usize,
    /// Pin pipeline threads to cores, best-effort.
    pub pin_threads: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: 200,
            reassembly_capacity: 200,
            num_workers: num_cpus::get().saturating_sub(1).max(1),
            pin_threads: true,
        }
    }
}

impl PipelineOptions {
    pub(crate) fn worker_count(&self) -> usize {
        self.num_workers.max(1)
    }
}

/// Run statistics for one compression invocation.
#[derive(Debug, Clone)]
pub struct CompressStats {
    pub chunks: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
    pub workers: usize,
}

/// Run statistics for one decompression invocation.
#[derive(Debug, Clone)]
pub struct DecompressStats {
    pub chunks: u64,
    pub output_bytes: u64,
    pub elapsed: Duration,
    pub workers: usize,
}

/// Single-file split/join pipeline built from [`PipelineOptions`].
#[derive(Debug, Clone, Default)]
pub struct ChunkPipeline {
    options: PipelineOptions,
}

impl ChunkPipeline {
    pub fn new() -> Self {
        Self::with_options(PipelineOptions::default())
    }

    pub fn with_options(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Splits `input` into `<output_base>_<n>.zip` chunk files in the
    /// input's directory.
    pub fn compress(&self, input: impl AsRef<Path>, output_base: &str) -> Result<CompressStats> {
        compress::run(&self.options, input.as_ref(), output_base)
    }

    /// Discovers the chunk set named by `input` and reassembles it into
    /// `output_name` in the same directory.
    ///
    /// `input` may point at any file of the set; its numeric suffix is
    /// stripped when deriving the set's base name.
    pub fn decompress(&self, input: impl AsRef<Path>, output_name: &str) -> Result<DecompressStats> {
        decompress::run(&self.options, input.as_ref(), output_name)
    }
}

/// Directory that holds the input file and receives all outputs.
pub(crate) fn base_dir_of(input: &Path) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub(crate) fn input_file_name(input: &Path) -> Result<&str> {
    input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ShardError::InvalidPath {
            path: input.to_path_buf(),
        })
}

/// Joins every pipeline thread, converting panics into recorded errors.
pub(crate) fn join_threads(handles: Vec<JoinHandle<()>>, sink: &ErrorSink) {
    for handle in handles {
        let name = handle
            .thread()
            .name()
            .unwrap_or("pipeline-thread")
            .to_string();
        if let Err(payload) = handle.join() {
            let details = if let Some(message) = payload.downcast_ref::<&str>() {
                (*message).to_string()
            } else if let Some(message) = payload.downcast_ref::<String>() {
                message.clone()
            } else {
                "unknown panic payload".to_string()
            };
            sink.record(format!("{name} panicked"), ShardError::WorkerPanic(details));
        }
    }
}

/// Folds the sink into the run result: the first error wins, the rest are
/// logged.
pub(crate) fn finish_run(sink: &ErrorSink) -> Result<()> {
    let mut errors = sink.drain().into_iter();
    let Some(first) = errors.next() else {
        return Ok(());
    };
    for extra in errors {
        tracing::error!(error = %extra.cause, "additional failure: {}", extra.message);
    }
    Err(first.cause)
}
