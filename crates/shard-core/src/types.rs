use std::path::PathBuf;

use bytes::Bytes;

use crate::error::ShardError;

pub type Result<T> = std::result::Result<T, ShardError>;

/// Fixed chunk payload size read from the input file.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Extension carried by every chunk container file.
pub const CHUNK_EXTENSION: &str = "zip";

/// A numbered slice of the original file, the pipeline's unit of parallel
/// work.
///
/// Sequence numbers are 1-based and contiguous within a run. A chunk is
/// immutable once produced; ownership moves from the producer through the
/// queue to exactly one consumer.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub sequence: u64,
    pub data: Bytes,
}

impl Chunk {
    pub fn new(sequence: u64, data: Bytes) -> Self {
        Self { sequence, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A chunk container discovered on disk during decompression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFileRef {
    pub sequence: u64,
    pub path: PathBuf,
}

/// Builds the on-disk name for one chunk container: `<base>_<n>.zip`,
/// 1-based, no zero padding.
pub fn chunk_file_name(output_base: &str, sequence: u64) -> String {
    format!("{output_base}_{sequence}.{CHUNK_EXTENSION}")
}

/// Human-readable glob for the chunk set of `base`, used in error messages.
pub fn chunk_file_pattern(base: &str) -> String {
    format!("{base}_*.{CHUNK_EXTENSION}")
}

/// Parses the sequence number out of `<base>_<number>.zip`.
///
/// Returns `None` for names that do not belong to the chunk set of `base`,
/// including a zero sequence (numbering is 1-based).
pub fn parse_chunk_sequence(file_name: &str, base: &str) -> Option<u64> {
    let rest = file_name.strip_prefix(base)?;
    let rest = rest.strip_prefix('_')?;
    let digits = rest.strip_suffix(CHUNK_EXTENSION)?.strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<u64>() {
        Ok(sequence) if sequence > 0 => Some(sequence),
        _ => None,
    }
}

/// Strips a trailing `_<number>.zip` suffix from a file name.
///
/// Lets discovery be pointed at a chunk file itself and still derive the
/// set's base name; names without the suffix are returned unchanged.
pub fn strip_chunk_suffix(file_name: &str) -> &str {
    if let Some(pos) = file_name.rfind('_') {
        let tail = &file_name[pos + 1..];
        if let Some(digits) = tail.strip_suffix(CHUNK_EXTENSION).and_then(|t| t.strip_suffix('.')) {
            if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
                return &file_name[..pos];
            }
        }
    }
    file_name
}
