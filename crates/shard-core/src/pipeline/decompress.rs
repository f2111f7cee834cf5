use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver};

use crate::codec::gzip;
use crate::core::affinity;
use crate::core::reassembly::{Drained, ReassemblyBuffer};
use crate::core::sink::ErrorSink;
use crate::error::ShardError;
use crate::types::{Chunk, ChunkFileRef, Result};

use super::{
    base_dir_of, discover, finish_run, input_file_name, join_threads, DecompressStats,
    PipelineOptions,
};

/// State owned by one decompression run, never reused across runs.
struct DecompressRun {
    output_path: PathBuf,
    pin_threads: bool,
    sink: ErrorSink,
    buffer: ReassemblyBuffer,
    output_bytes: AtomicU64,
}

/// Decrements the active-worker count when a decompressor thread exits by
/// any path, including a panic.
struct ActiveWorker<'a> {
    run: &'a DecompressRun,
}

impl Drop for ActiveWorker<'_> {
    fn drop(&mut self) {
        self.run.buffer.worker_exited();
    }
}

/// Reassembles the chunk set named by `input` into `output_name`.
pub(crate) fn run(
    options: &PipelineOptions,
    input: &Path,
    output_name: &str,
) -> Result<DecompressStats> {
    let base_dir = base_dir_of(input);
    let input_name = input_file_name(input)?;

    // Discovery and validation are synchronous: a malformed set fails here,
    // before any thread starts.
    let refs = discover::discover_chunks(&base_dir, input_name)?;
    let total_chunks = refs.len() as u64;

    let workers = options.worker_count();
    let run = Arc::new(DecompressRun {
        output_path: base_dir.join(output_name),
        pin_threads: options.pin_threads,
        sink: ErrorSink::new(),
        buffer: ReassemblyBuffer::new(options.reassembly_capacity, workers),
        output_bytes: AtomicU64::new(0),
    });

    tracing::debug!(
        input = %input.display(),
        output = %run.output_path.display(),
        workers,
        chunks = total_chunks,
        "starting decompression pipeline"
    );

    // The full validated set is enqueued before any worker starts, so an
    // empty channel unambiguously means the work is done.
    let (tx, rx) = bounded::<ChunkFileRef>(refs.len().max(1));
    for chunk_ref in refs {
        tx.send(chunk_ref)
            .expect("chunk ref channel sized for the full set");
    }
    drop(tx);

    let started_at = Instant::now();
    let mut handles = Vec::with_capacity(workers + 1);

    for worker_id in 0..workers {
        let worker_run = Arc::clone(&run);
        let worker_rx = rx.clone();
        match thread::Builder::new()
            .name(format!("decompress-worker-{worker_id}"))
            .spawn(move || decompress_worker(&worker_run, worker_id, worker_rx))
        {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                run.sink.record(
                    format!("failed to spawn decompress-worker-{worker_id}"),
                    ShardError::Io(err),
                );
                // The unspawned workers still count as active; drain them so
                // the reassembler cannot wait on threads that never started.
                for _ in worker_id..workers {
                    run.buffer.worker_exited();
                }
                break;
            }
        }
    }
    drop(rx);

    let reassembler_run = Arc::clone(&run);
    match thread::Builder::new()
        .name("reassembler".to_string())
        .spawn(move || reassemble(&reassembler_run))
    {
        Ok(handle) => handles.push(handle),
        Err(err) => run
            .sink
            .record("failed to spawn reassembler", ShardError::Io(err)),
    }

    join_threads(handles, &run.sink);
    finish_run(&run.sink)?;

    Ok(DecompressStats {
        chunks: total_chunks,
        output_bytes: run.output_bytes.load(Ordering::Acquire),
        elapsed: started_at.elapsed(),
        workers,
    })
}

fn decompress_worker(run: &DecompressRun, worker_id: usize, rx: Receiver<ChunkFileRef>) {
    let _active = ActiveWorker { run };
    if run.pin_threads {
        affinity::pin_current_thread(affinity::worker_core(worker_id));
    }

    loop {
        if run.sink.fail_fast() {
            return;
        }
        // Backpressure: hold off dequeuing while the writer is behind, so
        // decompressed data never piles up unboundedly.
        if !run.buffer.wait_for_space(&run.sink) {
            return;
        }
        let Ok(chunk_ref) = rx.try_recv() else {
            return;
        };

        match read_chunk_file(&chunk_ref) {
            Ok(chunk) => run.buffer.insert(chunk),
            Err(err) => {
                run.sink.record(
                    format!(
                        "failed to decompress chunk file {}",
                        chunk_ref.path.display()
                    ),
                    err,
                );
                return;
            }
        }
    }
}

/// Fully decompresses one chunk container into memory.
fn read_chunk_file(chunk_ref: &ChunkFileRef) -> Result<Chunk> {
    let file = File::open(&chunk_ref.path)?;
    let data = gzip::decompress_to_vec(BufReader::new(file))?;
    Ok(Chunk::new(chunk_ref.sequence, Bytes::from(data)))
}

/// Drains completed chunks strictly in sequence order into the output file.
///
/// Sole writer of the output; coordination with the workers happens entirely
/// through the reassembly buffer. On abort the partial output is left on
/// disk for the caller to discard.
fn reassemble(run: &DecompressRun) {
    if run.pin_threads {
        affinity::pin_current_thread(affinity::SEQUENTIAL_CORE);
    }

    let file = match File::create(&run.output_path) {
        Ok(file) => file,
        Err(err) => {
            run.sink.record(
                format!(
                    "failed to create output file {}",
                    run.output_path.display()
                ),
                err.into(),
            );
            return;
        }
    };
    let mut writer = BufWriter::new(file);
    let mut next_expected = 1u64;

    loop {
        match run.buffer.take_next(next_expected, &run.sink) {
            Drained::Chunk(data) => {
                if let Err(err) = writer.write_all(&data) {
                    run.sink.record(
                        format!(
                            "failed to write chunk {next_expected} to {}",
                            run.output_path.display()
                        ),
                        err.into(),
                    );
                    return;
                }
                run.output_bytes
                    .fetch_add(data.len() as u64, Ordering::AcqRel);
                next_expected += 1;
            }
            Drained::Finished => break,
            Drained::Aborted => return,
        }
    }

    if let Err(err) = writer.flush() {
        run.sink.record(
            format!("failed to flush output file {}", run.output_path.display()),
            err.into(),
        );
    }
}
