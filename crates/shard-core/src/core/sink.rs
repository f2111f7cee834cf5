use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::ShardError;

/// A single captured failure: what the thread was doing plus the cause.
#[derive(Debug)]
pub struct ErrorRecord {
    pub message: String,
    pub cause: ShardError,
}

/// Thread-safe failure collector shared by every pipeline thread.
///
/// The first recorded error raises the fail-fast flag; every pipeline loop
/// checks the flag each iteration and exits promptly. Records are append-only
/// and inspected by the orchestrator after all threads have been joined.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: Mutex<Vec<ErrorRecord>>,
    fail_fast: AtomicBool,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure and raises the fail-fast signal.
    pub fn record(&self, message: impl Into<String>, cause: ShardError) {
        let message = message.into();
        tracing::error!(error = %cause, "{message}");
        self.fail_fast.store(true, Ordering::Release);
        self.errors
            .lock()
            .expect("error sink mutex poisoned")
            .push(ErrorRecord { message, cause });
    }

    /// True once any thread has recorded an error.
    pub fn fail_fast(&self) -> bool {
        self.fail_fast.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.errors.lock().expect("error sink mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes and returns every recorded error.
    pub fn drain(&self) -> Vec<ErrorRecord> {
        let mut errors = self.errors.lock().expect("error sink mutex poisoned");
        std::mem::take(&mut *errors)
    }
}
