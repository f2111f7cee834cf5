use std::fs;
use std::path::PathBuf;

use shard_core::{
    chunk_file_name, discover_chunks, validate_chunk_set, ChunkFileRef, ShardError,
};
use tempfile::TempDir;

fn touch(dir: &std::path::Path, name: &str) -> std::io::Result<()> {
    fs::write(dir.join(name), b"x")
}

fn make_refs(sequences: &[u64]) -> Vec<ChunkFileRef> {
    sequences
        .iter()
        .map(|&sequence| ChunkFileRef {
            sequence,
            path: PathBuf::from(chunk_file_name("out", sequence)),
        })
        .collect()
}

#[test]
fn chunk_file_names_have_no_zero_padding() {
    assert_eq!(chunk_file_name("out", 1), "out_1.zip");
    assert_eq!(chunk_file_name("out", 12), "out_12.zip");
    assert_eq!(chunk_file_name("archive.tar", 3), "archive.tar_3.zip");
}

#[test]
fn discovers_a_contiguous_set_sorted_by_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    // Created out of order on purpose.
    for name in ["out_3.zip", "out_1.zip", "out_2.zip"] {
        touch(dir.path(), name)?;
    }

    let refs = discover_chunks(dir.path(), "out")?;
    let sequences: Vec<u64> = refs.iter().map(|chunk| chunk.sequence).collect();
    assert_eq!(sequences, [1, 2, 3]);
    Ok(())
}

#[test]
fn input_may_be_a_chunk_file_of_the_set() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    for name in ["data_1.zip", "data_2.zip"] {
        touch(dir.path(), name)?;
    }

    let refs = discover_chunks(dir.path(), "data_2.zip")?;
    assert_eq!(refs.len(), 2);
    Ok(())
}

#[test]
fn unrelated_files_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    touch(dir.path(), "out_1.zip")?;
    // None of these belong to the "out" chunk set.
    for name in [
        "notes.txt",
        "out_.zip",
        "out_x.zip",
        "out_0.zip",
        "out_1.gz",
        "outer_1.zip",
        "out_1.zip.bak",
    ] {
        touch(dir.path(), name)?;
    }

    let refs = discover_chunks(dir.path(), "out")?;
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].sequence, 1);
    Ok(())
}

#[test]
fn empty_set_is_a_not_found_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    touch(dir.path(), "something_else.txt")?;

    let error = discover_chunks(dir.path(), "out").unwrap_err();
    assert!(
        matches!(error, ShardError::NoChunksFound { .. }),
        "unexpected error: {error}"
    );
    Ok(())
}

#[test]
fn gap_in_the_set_names_the_missing_sequence() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    for name in ["out_1.zip", "out_2.zip", "out_4.zip"] {
        touch(dir.path(), name)?;
    }

    let error = discover_chunks(dir.path(), "out").unwrap_err();
    assert!(
        matches!(error, ShardError::MissingChunk { sequence: 3 }),
        "unexpected error: {error}"
    );
    Ok(())
}

#[test]
fn set_not_starting_at_one_is_missing_chunk_one() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    for name in ["out_2.zip", "out_3.zip"] {
        touch(dir.path(), name)?;
    }

    let error = discover_chunks(dir.path(), "out").unwrap_err();
    assert!(
        matches!(error, ShardError::MissingChunk { sequence: 1 }),
        "unexpected error: {error}"
    );
    Ok(())
}

#[test]
fn validation_distinguishes_duplicates_from_gaps() {
    // A duplicate-for-missing swap passes a count == max check; full set
    // equality catches it.
    let error = validate_chunk_set(&make_refs(&[1, 2, 2]), "out").unwrap_err();
    assert!(
        matches!(error, ShardError::DuplicateChunk { sequence: 2 }),
        "unexpected error: {error}"
    );

    let error = validate_chunk_set(&make_refs(&[1, 3]), "out").unwrap_err();
    assert!(
        matches!(error, ShardError::MissingChunk { sequence: 2 }),
        "unexpected error: {error}"
    );

    assert!(validate_chunk_set(&make_refs(&[1, 2, 3]), "out").is_ok());
}
