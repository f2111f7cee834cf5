use std::fs;
use std::path::Path;

use shard_core::{ChunkPipeline, PipelineOptions, ShardError};
use tempfile::TempDir;

/// Position-dependent pattern so any reordering or truncation breaks the
/// byte-for-byte comparison.
fn build_fixture(len: usize) -> Vec<u8> {
    (0..len).map(|index| (index % 251) as u8).collect()
}

fn write_fixture(dir: &Path, name: &str, data: &[u8]) -> std::io::Result<std::path::PathBuf> {
    let path = dir.join(name);
    fs::write(&path, data)?;
    Ok(path)
}

fn test_pipeline(chunk_size: usize, workers: usize) -> ChunkPipeline {
    ChunkPipeline::with_options(PipelineOptions {
        chunk_size,
        num_workers: workers,
        pin_threads: false,
        ..PipelineOptions::default()
    })
}

#[test]
fn roundtrip_reconstructs_original_bytes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data = build_fixture(512 * 1024);
    let input = write_fixture(dir.path(), "source.bin", &data)?;

    let pipeline = test_pipeline(64 * 1024, 4);
    let stats = pipeline.compress(&input, "out")?;
    assert_eq!(stats.chunks, 8);
    assert_eq!(stats.input_bytes, data.len() as u64);
    assert!(stats.output_bytes > 0);

    let restored_stats = pipeline.decompress(dir.path().join("out_1.zip"), "restored.bin")?;
    assert_eq!(restored_stats.chunks, 8);
    assert_eq!(restored_stats.output_bytes, data.len() as u64);

    let restored = fs::read(dir.path().join("restored.bin"))?;
    assert_eq!(restored, data);
    Ok(())
}

#[test]
fn chunk_count_is_input_size_over_chunk_size_rounded_up(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let pipeline = test_pipeline(1000, 2);

    for (len, expected_chunks, base) in [
        (1usize, 1u64, "tiny"),
        (1000, 1, "exact"),
        (1001, 2, "carry"),
        (4999, 5, "five"),
    ] {
        let data = build_fixture(len);
        let input = write_fixture(dir.path(), &format!("{base}.bin"), &data)?;
        let stats = pipeline.compress(&input, base)?;
        assert_eq!(stats.chunks, expected_chunks, "input of {len} bytes");

        for sequence in 1..=expected_chunks {
            assert!(dir.path().join(format!("{base}_{sequence}.zip")).is_file());
        }
        assert!(!dir
            .path()
            .join(format!("{base}_{}.zip", expected_chunks + 1))
            .exists());
    }
    Ok(())
}

#[test]
fn two_and_a_half_megabytes_split_into_three_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data = build_fixture(2_500_000);
    let input = write_fixture(dir.path(), "payload.dat", &data)?;

    // Default chunk size of 1,000,000 bytes.
    let pipeline = test_pipeline(shard_core::DEFAULT_CHUNK_SIZE, 3);
    let stats = pipeline.compress(&input, "out")?;
    assert_eq!(stats.chunks, 3);

    for name in ["out_1.zip", "out_2.zip", "out_3.zip"] {
        assert!(dir.path().join(name).is_file(), "{name} should exist");
    }
    assert!(!dir.path().join("out_4.zip").exists());

    // Point discovery at a chunk file in the middle of the set.
    let restored_stats = pipeline.decompress(dir.path().join("out_3.zip"), "restored.dat")?;
    assert_eq!(restored_stats.chunks, 3);

    let restored = fs::read(dir.path().join("restored.dat"))?;
    assert_eq!(restored.len(), 2_500_000);
    assert_eq!(restored, data);
    Ok(())
}

#[test]
fn empty_input_produces_no_chunk_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let input = write_fixture(dir.path(), "empty.bin", &[])?;

    let pipeline = test_pipeline(1000, 2);
    let stats = pipeline.compress(&input, "empty")?;
    assert_eq!(stats.chunks, 0);
    assert_eq!(stats.input_bytes, 0);
    assert!(!dir.path().join("empty_1.zip").exists());
    Ok(())
}

#[test]
fn stale_chunk_file_fails_the_run() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data = build_fixture(3000);
    let input = write_fixture(dir.path(), "source.bin", &data)?;

    // A leftover from a previous run must not be silently overwritten.
    write_fixture(dir.path(), "out_2.zip", b"stale")?;

    let pipeline = test_pipeline(1000, 2);
    let error = pipeline.compress(&input, "out").unwrap_err();
    assert!(
        matches!(error, ShardError::ChunkFileExists { .. }),
        "unexpected error: {error}"
    );
    Ok(())
}

#[test]
fn corrupt_chunk_stops_output_at_last_contiguous_prefix(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data = build_fixture(3000);
    let input = write_fixture(dir.path(), "source.bin", &data)?;

    // Single worker keeps chunk processing order deterministic.
    let pipeline = test_pipeline(1000, 1);
    pipeline.compress(&input, "out")?;

    write_fixture(dir.path(), "out_2.zip", b"this is not a gzip stream")?;

    let error = pipeline
        .decompress(dir.path().join("out_1.zip"), "restored.bin")
        .unwrap_err();
    assert!(
        matches!(error, ShardError::DecompressionError(_)),
        "unexpected error: {error}"
    );

    // Whatever was written before the abort must be a strict prefix of the
    // original; nothing past the last valid contiguous sequence appears.
    let restored = fs::read(dir.path().join("restored.bin"))?;
    assert!(restored.len() < data.len());
    assert_eq!(restored, data[..restored.len()]);
    Ok(())
}

#[test]
fn missing_chunk_is_detected_before_any_output_is_written(
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let data = build_fixture(4000);
    let input = write_fixture(dir.path(), "source.bin", &data)?;

    let pipeline = test_pipeline(1000, 2);
    pipeline.compress(&input, "out")?;
    fs::remove_file(dir.path().join("out_3.zip"))?;

    let error = pipeline
        .decompress(dir.path().join("out_1.zip"), "restored.bin")
        .unwrap_err();
    assert!(
        matches!(error, ShardError::MissingChunk { sequence: 3 }),
        "unexpected error: {error}"
    );
    assert!(
        !dir.path().join("restored.bin").exists(),
        "discovery failure must precede any worker or writer activity"
    );
    Ok(())
}
