use crate::engine::ScanResult;

/// Trait for reporting scan progress.
///
/// All calls come from the thread that called `scan`. Every method has a
/// no-op default, and any `Fn(&str, f64)` closure is a reporter that only
/// listens to [`ProgressReporter::on_progress`].
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _total_files: usize) {}
    /// `fraction` is in `[0, 1]`; fired once per file taken off the queue.
    fn on_progress(&self, _current_file: &str, _fraction: f64) {}
    fn on_scan_complete(&self, _result: &ScanResult) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(&str, f64) + Send + Sync,
{
    fn on_progress(&self, current_file: &str, fraction: f64) {
        self(current_file, fraction)
    }
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
