use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;

use crate::core::sink::ErrorSink;
use crate::types::Chunk;

const SPACE_WAIT: Duration = Duration::from_millis(200);
const READY_WAIT: Duration = Duration::from_millis(100);

/// Outcome of one in-order drain attempt.
#[derive(Debug)]
pub enum Drained {
    /// The chunk payload for the requested sequence.
    Chunk(Bytes),
    /// Every worker has exited and nothing is left to drain.
    Finished,
    /// The fail-fast flag was raised.
    Aborted,
}

/// Holding area where decompressed chunks wait, possibly out of order, until
/// the reassembler drains them in strict sequence order.
///
/// Capacity is advisory and enforced on the dequeue side: workers call
/// [`wait_for_space`](Self::wait_for_space) before taking more work, so the
/// buffer never grows past capacity by more than the chunks already in
/// flight. All waits carry a timeout so the fail-fast flag is observed within
/// a fixed interval.
///
/// Invariant: the buffer only ever holds sequences greater than or equal to
/// the next expected output sequence; drained entries are removed before the
/// sequence counter advances.
#[derive(Debug)]
pub struct ReassemblyBuffer {
    pending: Mutex<BTreeMap<u64, Bytes>>,
    changed: Condvar,
    capacity: usize,
    active_workers: AtomicUsize,
}

impl ReassemblyBuffer {
    /// Creates a buffer with the given capacity, tracking `workers` active
    /// inserters.
    pub fn new(capacity: usize, workers: usize) -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            changed: Condvar::new(),
            capacity: capacity.max(1),
            active_workers: AtomicUsize::new(workers),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of workers that have not exited yet.
    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::Acquire)
    }

    /// Blocks until the buffer has room for another chunk.
    ///
    /// Returns false if fail-fast was raised while waiting; the caller must
    /// stop taking work.
    pub fn wait_for_space(&self, sink: &ErrorSink) -> bool {
        let mut pending = self.lock();
        while pending.len() >= self.capacity {
            if sink.fail_fast() {
                return false;
            }
            let (guard, _timeout) = self
                .changed
                .wait_timeout(pending, SPACE_WAIT)
                .expect("reassembly buffer mutex poisoned");
            pending = guard;
        }
        !sink.fail_fast()
    }

    /// Inserts a decompressed chunk and wakes the reassembler.
    ///
    /// Never blocks: a worker that already dequeued a chunk must be able to
    /// hand it over even when the buffer is momentarily at capacity,
    /// otherwise the writer could starve waiting for that very sequence.
    pub fn insert(&self, chunk: Chunk) {
        let mut pending = self.lock();
        pending.insert(chunk.sequence, chunk.data);
        self.changed.notify_all();
    }

    /// Removes the chunk for `sequence`, waiting until it arrives, every
    /// worker has exited, or fail-fast is raised.
    pub fn take_next(&self, sequence: u64, sink: &ErrorSink) -> Drained {
        let mut pending = self.lock();
        loop {
            if sink.fail_fast() {
                return Drained::Aborted;
            }
            if let Some(data) = pending.remove(&sequence) {
                self.changed.notify_all();
                return Drained::Chunk(data);
            }
            if self.active_workers() == 0 && pending.is_empty() {
                return Drained::Finished;
            }
            let (guard, _timeout) = self
                .changed
                .wait_timeout(pending, READY_WAIT)
                .expect("reassembly buffer mutex poisoned");
            pending = guard;
        }
    }

    /// Marks one worker as exited and wakes the reassembler.
    pub fn worker_exited(&self) {
        // Hold the lock so the wakeup cannot slip between a waiter's check
        // and its wait.
        let _pending = self.lock();
        self.active_workers.fetch_sub(1, Ordering::AcqRel);
        self.changed.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, Bytes>> {
        self.pending
            .lock()
            .expect("reassembly buffer mutex poisoned")
    }
}
