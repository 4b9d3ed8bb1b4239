use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use suparna_core::{ProgressReporter, ScanResult, ScanStatus};

const BAR_LENGTH: u64 = 1000;

/// CLI progress reporter using an indicatif bar driven by the scan fraction.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, _total_files: usize) {
        let pb = ProgressBar::new(BAR_LENGTH);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Indexing [{bar:30.cyan/dim}] {percent:>3}% ({eta} remaining) {wide_msg}",
        ) {
            pb.set_style(
                style
                    .progress_chars("━╸─")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_progress(&self, current_file: &str, fraction: f64) {
        self.with_bar(|pb| {
            pb.set_position((fraction.clamp(0.0, 1.0) * BAR_LENGTH as f64) as u64);
            pb.set_message(current_file.to_string());
        });
    }

    fn on_scan_complete(&self, result: &ScanResult) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }

        let verdict = match result.status {
            ScanStatus::Completed => format!("{} Scan complete", "✓".green()),
            ScanStatus::Aborted => format!("{} Scan aborted", "!".yellow()),
            ScanStatus::AlreadyIndexed => format!("{} Already indexed", "✓".green()),
        };
        eprintln!(
            "  {}: {} of {} files in {:.2}s",
            verdict,
            result.processed,
            result.total_files,
            result.duration.as_secs_f64()
        );
    }
}
