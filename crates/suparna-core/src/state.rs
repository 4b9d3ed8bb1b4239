use crate::error::Error;
use crate::storage::Database;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared state of the scan running on one engine.
///
/// `aborted` is the only field written by more than one thread (the caller
/// through [`ScanState::abort`], the producer by reading it between files).
/// `lifecycle` serializes claiming, aborting and releasing a scan so an
/// abort aimed at one scan never lands on the next.
#[derive(Debug, Default)]
pub struct ScanState {
    lifecycle: Mutex<()>,
    running: AtomicBool,
    aborted: Arc<AtomicBool>,
    total_files: AtomicUsize,
    processed: AtomicUsize,
}

/// Marks the state as running until dropped.
#[derive(Debug)]
pub struct ScanGuard<'a> {
    state: &'a ScanState,
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        let _lifecycle = self.state.lock_lifecycle();
        self.state.running.store(false, Ordering::SeqCst);
    }
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the state for a new scan and reset its counters.
    pub fn begin(&self) -> Result<ScanGuard<'_>, Error> {
        let _lifecycle = self.lock_lifecycle();
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::ScanInProgress)?;

        self.aborted.store(false, Ordering::SeqCst);
        self.total_files.store(0, Ordering::SeqCst);
        self.processed.store(0, Ordering::SeqCst);
        Ok(ScanGuard { state: self })
    }

    /// Request cooperative cancellation. Returns `false` (and does nothing)
    /// when no scan is running.
    pub fn abort(&self) -> bool {
        let _lifecycle = self.lock_lifecycle();
        if !self.running.load(Ordering::SeqCst) {
            return false;
        }
        self.aborted.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Handle on the abort flag for the producer side.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.aborted)
    }

    pub fn set_total_files(&self, total: usize) {
        self.total_files.store(total, Ordering::SeqCst);
    }

    pub fn total_files(&self) -> usize {
        self.total_files.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Count one more processed file, never past `total_files`.
    pub fn advance(&self) -> usize {
        let total = self.total_files();
        match self
            .processed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < total).then_some(n + 1)
            }) {
            Ok(previous) => previous + 1,
            Err(current) => current,
        }
    }

    /// Fraction of the counted files processed so far, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        let total = self.total_files();
        if total == 0 {
            return 1.0;
        }
        self.processed() as f64 / total as f64
    }
}

/// Cloneable handle that lets another thread cancel the engine's scan.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    state: Arc<ScanState>,
}

impl AbortHandle {
    pub(crate) fn new(state: Arc<ScanState>) -> Self {
        Self { state }
    }

    pub fn abort(&self) -> bool {
        self.state.abort()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

/// A root counts as indexed once any stored file, original or duplicate,
/// lives beneath it.
pub fn is_already_indexed(db: &Database, root: &Path) -> rusqlite::Result<bool> {
    Ok(db.count_files_under(root)? > 0)
}
