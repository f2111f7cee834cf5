use std::fs::File;
use std::io::{BufWriter, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use crate::codec::gzip;
use crate::core::affinity;
use crate::core::sink::ErrorSink;
use crate::error::ShardError;
use crate::types::{chunk_file_name, Chunk, Result};

use super::{base_dir_of, finish_run, join_threads, CompressStats, PipelineOptions};

/// Retry interval for a full queue; bounds how long fail-fast can go
/// unobserved while the producer is blocked.
const SEND_RETRY: Duration = Duration::from_millis(200);
const RECV_WAIT: Duration = Duration::from_millis(100);

/// State owned by one compression run, never reused across runs.
struct CompressRun {
    input_path: PathBuf,
    base_dir: PathBuf,
    output_base: String,
    chunk_size: usize,
    pin_threads: bool,
    sink: ErrorSink,
    chunks_produced: AtomicU64,
    input_bytes: AtomicU64,
    output_bytes: AtomicU64,
}

/// Splits `input` into gzip chunk files next to it.
pub(crate) fn run(
    options: &PipelineOptions,
    input: &Path,
    output_base: &str,
) -> Result<CompressStats> {
    let workers = options.worker_count();
    let run = Arc::new(CompressRun {
        input_path: input.to_path_buf(),
        base_dir: base_dir_of(input),
        output_base: output_base.to_string(),
        chunk_size: options.chunk_size.max(1),
        pin_threads: options.pin_threads,
        sink: ErrorSink::new(),
        chunks_produced: AtomicU64::new(0),
        input_bytes: AtomicU64::new(0),
        output_bytes: AtomicU64::new(0),
    });

    tracing::debug!(
        input = %input.display(),
        output_base,
        workers,
        chunk_size = run.chunk_size,
        "starting compression pipeline"
    );

    let started_at = Instant::now();
    let (tx, rx) = bounded::<Chunk>(options.queue_capacity.max(1));
    let mut handles = Vec::with_capacity(workers + 1);

    let producer_run = Arc::clone(&run);
    match thread::Builder::new()
        .name("chunk-producer".to_string())
        .spawn(move || produce_chunks(&producer_run, tx))
    {
        Ok(handle) => handles.push(handle),
        Err(err) => run
            .sink
            .record("failed to spawn chunk producer", ShardError::Io(err)),
    }

    for worker_id in 0..workers {
        if run.sink.fail_fast() {
            break;
        }
        let worker_run = Arc::clone(&run);
        let worker_rx = rx.clone();
        match thread::Builder::new()
            .name(format!("compress-worker-{worker_id}"))
            .spawn(move || compress_worker(&worker_run, worker_id, worker_rx))
        {
            Ok(handle) => handles.push(handle),
            Err(err) => {
                run.sink.record(
                    format!("failed to spawn compress-worker-{worker_id}"),
                    ShardError::Io(err),
                );
                break;
            }
        }
    }
    drop(rx);

    join_threads(handles, &run.sink);
    finish_run(&run.sink)?;

    Ok(CompressStats {
        chunks: run.chunks_produced.load(Ordering::Acquire),
        input_bytes: run.input_bytes.load(Ordering::Acquire),
        output_bytes: run.output_bytes.load(Ordering::Acquire),
        elapsed: started_at.elapsed(),
        workers,
    })
}

/// Reads the input sequentially and feeds numbered chunks into the queue.
///
/// Dropping the sender is the "no more chunks will be produced" signal the
/// workers wait on.
fn produce_chunks(run: &CompressRun, tx: Sender<Chunk>) {
    if run.pin_threads {
        affinity::pin_current_thread(affinity::SEQUENTIAL_CORE);
    }

    let mut file = match File::open(&run.input_path) {
        Ok(file) => file,
        Err(err) => {
            run.sink.record(
                format!("failed to open input file {}", run.input_path.display()),
                err.into(),
            );
            return;
        }
    };

    let mut sequence = 1u64;
    loop {
        if run.sink.fail_fast() {
            return;
        }

        let mut block = vec![0u8; run.chunk_size];
        let filled = match read_block(&mut file, &mut block) {
            Ok(filled) => filled,
            Err(err) => {
                run.sink.record(
                    format!(
                        "failed to read chunk {sequence} from {}",
                        run.input_path.display()
                    ),
                    err.into(),
                );
                return;
            }
        };
        if filled == 0 {
            return;
        }
        block.truncate(filled);

        run.input_bytes.fetch_add(filled as u64, Ordering::AcqRel);
        run.chunks_produced.fetch_add(1, Ordering::AcqRel);
        let mut chunk = Chunk::new(sequence, Bytes::from(block));
        sequence += 1;

        // Backpressure: the channel is capacity-bounded, so a full queue
        // blocks here; the timeout keeps fail-fast observable meanwhile.
        loop {
            match tx.send_timeout(chunk, SEND_RETRY) {
                Ok(()) => break,
                Err(SendTimeoutError::Timeout(returned)) => {
                    if run.sink.fail_fast() {
                        return;
                    }
                    chunk = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => return,
            }
        }
    }
}

/// Reads until `block` is full or EOF; short reads are accumulated so every
/// chunk except the last has the exact configured size.
fn read_block(file: &mut File, block: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0usize;
    while filled < block.len() {
        match file.read(&mut block[filled..]) {
            Ok(0) => break,
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

fn compress_worker(run: &CompressRun, worker_id: usize, rx: Receiver<Chunk>) {
    if run.pin_threads {
        affinity::pin_current_thread(affinity::worker_core(worker_id));
    }

    loop {
        if run.sink.fail_fast() {
            return;
        }
        let chunk = match rx.recv_timeout(RECV_WAIT) {
            Ok(chunk) => chunk,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        };

        if let Err(err) = write_chunk_file(run, &chunk) {
            run.sink.record(
                format!(
                    "failed to write chunk {} of {}",
                    chunk.sequence, run.output_base
                ),
                err,
            );
            return;
        }
    }
}

/// Compresses one chunk into its own container file.
///
/// Creation is create-new: a leftover file from a previous run is an error,
/// never silently overwritten.
fn write_chunk_file(run: &CompressRun, chunk: &Chunk) -> Result<()> {
    let path = run
        .base_dir
        .join(chunk_file_name(&run.output_base, chunk.sequence));
    let file = match File::create_new(&path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => {
            return Err(ShardError::ChunkFileExists { path });
        }
        Err(err) => return Err(err.into()),
    };

    let mut writer = BufWriter::new(file);
    gzip::compress_into(&chunk.data, &mut writer)?;
    let file = writer
        .into_inner()
        .map_err(|err| ShardError::Io(err.into_error()))?;
    let written = file.metadata()?.len();
    run.output_bytes.fetch_add(written, Ordering::AcqRel);
    Ok(())
}
