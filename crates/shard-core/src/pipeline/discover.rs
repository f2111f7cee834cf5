use std::fs;
use std::path::Path;

use crate::error::ShardError;
use crate::types::{
    chunk_file_pattern, parse_chunk_sequence, strip_chunk_suffix, ChunkFileRef, Result,
};

/// Finds and validates the chunk-file set for `input_name` inside `base_dir`.
///
/// The input name may itself be a chunk file; any trailing `_<number>.zip`
/// suffix is stripped before matching. Validation runs here, synchronously,
/// so a malformed set never starts partial work.
pub fn discover_chunks(base_dir: &Path, input_name: &str) -> Result<Vec<ChunkFileRef>> {
    let base = strip_chunk_suffix(input_name);
    let mut found = Vec::new();

    for entry in fs::read_dir(base_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(sequence) = parse_chunk_sequence(name, base) {
            found.push(ChunkFileRef {
                sequence,
                path: entry.path(),
            });
        }
    }

    found.sort_by_key(|chunk| chunk.sequence);
    validate_chunk_set(&found, base)?;

    tracing::debug!(base, chunks = found.len(), "discovered chunk set");
    Ok(found)
}

/// Checks that the sorted sequence set equals `{1..=max}` exactly.
///
/// A gap yields a missing-chunk error and a repeat a duplicate-chunk error;
/// counting alone cannot tell the two apart.
pub fn validate_chunk_set(found: &[ChunkFileRef], base: &str) -> Result<()> {
    if found.is_empty() {
        return Err(ShardError::NoChunksFound {
            pattern: chunk_file_pattern(base),
        });
    }

    let mut expected = 1u64;
    for chunk in found {
        if chunk.sequence == expected {
            expected += 1;
            continue;
        }
        if chunk.sequence < expected {
            return Err(ShardError::DuplicateChunk {
                sequence: chunk.sequence,
            });
        }
        return Err(ShardError::MissingChunk { sequence: expected });
    }
    Ok(())
}
