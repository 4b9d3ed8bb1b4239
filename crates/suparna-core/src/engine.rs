use crate::config::AppConfig;
use crate::error::Error;
use crate::hasher::{self, HashAlgorithm};
use crate::progress::ProgressReporter;
use crate::scanner::Walker;
use crate::state::{self, AbortHandle, ScanState};
use crate::storage::{BatchWriter, Database, FileRecord};
use crossbeam_channel::{bounded, Sender};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Progress message sent once when the root was indexed by an earlier scan.
pub const ALREADY_INDEXED_MESSAGE: &str = "Directory already scanned";

pub struct ScanEngine {
    config: AppConfig,
    db_path: String,
    state: Arc<ScanState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// Every counted file went through the pipeline.
    Completed,
    /// Stopped early by `abort`; rows written before that are kept.
    Aborted,
    /// Files under the root were already stored; nothing was done.
    AlreadyIndexed,
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub status: ScanStatus,
    pub root: PathBuf,
    pub duration: Duration,
    pub total_files: usize,
    pub processed: usize,
    pub originals: usize,
    pub duplicates: usize,
    pub hash_failures: usize,
    pub persist_failures: usize,
}

impl ScanResult {
    fn new(root: PathBuf) -> Self {
        Self {
            status: ScanStatus::Completed,
            root,
            duration: Duration::ZERO,
            total_files: 0,
            processed: 0,
            originals: 0,
            duplicates: 0,
            hash_failures: 0,
            persist_failures: 0,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.status == ScanStatus::Aborted
    }
}

#[derive(Debug, Default)]
struct ProducerStats {
    hashed: usize,
    hash_failures: usize,
}

impl ScanEngine {
    pub fn new(config: AppConfig) -> Self {
        Self {
            db_path: config.db_path.clone(),
            config,
            state: Arc::new(ScanState::new()),
        }
    }

    pub fn with_db_path(mut self, path: &str) -> Self {
        self.db_path = path.to_string();
        self
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Handle that can cancel this engine's scan from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle::new(Arc::clone(&self.state))
    }

    /// Ask the running scan to stop. No-op when idle.
    pub fn abort(&self) -> bool {
        self.state.abort()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    /// Index every regular file under `root`, flagging duplicates.
    ///
    /// One producer thread walks and hashes, feeding a bounded queue; the
    /// calling thread drains it, reports progress and writes to the store.
    /// Per-file failures are logged and counted; only failures to start or
    /// to commit are returned as errors.
    pub fn scan<R>(&self, root: &Path, reporter: &R) -> Result<ScanResult, Error>
    where
        R: ProgressReporter + ?Sized,
    {
        let start = Instant::now();
        let root = resolve_root(root)?;
        let _guard = self.state.begin()?;
        let mut result = ScanResult::new(root.clone());

        let db = Database::open(&self.db_path)?;

        if state::is_already_indexed(&db, &root)? {
            info!("{} is already indexed, skipping", root.display());
            reporter.on_progress(ALREADY_INDEXED_MESSAGE, 1.0);
            result.status = ScanStatus::AlreadyIndexed;
            result.duration = start.elapsed();
            reporter.on_scan_complete(&result);
            return Ok(result);
        }

        let walker = Walker::new(&root)
            .with_ignore_patterns(&self.config.ignore_patterns)
            .with_abort_flag(self.state.abort_flag());

        info!("Counting files under {}...", root.display());
        let total_files = walker.count_files();
        self.state.set_total_files(total_files);
        result.total_files = total_files;

        if total_files == 0 {
            debug!("Nothing to index under {}", root.display());
            if self.state.is_aborted() {
                result.status = ScanStatus::Aborted;
            }
            result.duration = start.elapsed();
            reporter.on_scan_complete(&result);
            return Ok(result);
        }

        info!("Indexing {} files...", total_files);
        reporter.on_scan_start(total_files);

        let mut writer = BatchWriter::begin(&db, self.config.batch_size)?;
        let (sender, receiver) = bounded::<FileRecord>(self.config.queue_capacity.max(1));
        let algorithm = self.config.hash_algorithm;

        let producer_stats = thread::scope(|scope| -> Result<ProducerStats, Error> {
            let producer = scope.spawn(move || produce(&walker, algorithm, sender));

            let receiver = receiver;
            for record in receiver.iter() {
                if self.state.is_aborted() {
                    debug!("Abort observed, discarding queued records");
                    break;
                }

                self.state.advance();
                reporter.on_progress(&record.name, self.state.fraction());

                match writer.persist(&record) {
                    Ok(outcome) if outcome.is_duplicate() => result.duplicates += 1,
                    Ok(_) => result.originals += 1,
                    Err(e) => {
                        warn!("Error persisting {}: {}", record.path, e);
                        result.persist_failures += 1;
                    }
                }
                writer.commit_if_full()?;
            }
            // Unblocks a producer waiting on a full queue.
            drop(receiver);

            producer
                .join()
                .map_err(|_| Error::Other("file producer thread panicked".to_string()))
        })?;

        writer.finish()?;

        result.processed = self.state.processed();
        result.hash_failures = producer_stats.hash_failures;
        if self.state.is_aborted() {
            result.status = ScanStatus::Aborted;
        }
        result.duration = start.elapsed();

        info!(
            "Scan of {} {:?} in {:.2}s: {} hashed, {} originals, {} duplicates, {} skipped",
            root.display(),
            result.status,
            result.duration.as_secs_f64(),
            producer_stats.hashed,
            result.originals,
            result.duplicates,
            result.hash_failures + result.persist_failures,
        );
        reporter.on_scan_complete(&result);

        Ok(result)
    }
}

/// Canonicalize the root and make sure it can be listed.
fn resolve_root(root: &Path) -> Result<PathBuf, Error> {
    let invalid = |source: io::Error| Error::InvalidRoot {
        path: root.to_path_buf(),
        source,
    };

    let canonical = fs::canonicalize(root).map_err(invalid)?;
    if !canonical.is_dir() {
        return Err(invalid(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a directory",
        )));
    }
    fs::read_dir(&canonical).map_err(invalid)?;
    Ok(canonical)
}

/// Walk and hash, pushing finished records into the queue. Blocks while
/// the queue is full and stops once the consumer goes away.
fn produce(walker: &Walker, algorithm: HashAlgorithm, sender: Sender<FileRecord>) -> ProducerStats {
    let mut stats = ProducerStats::default();

    for entry in walker.walk() {
        let hash = match hasher::hash_file(&entry.path, algorithm) {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Error hashing {}: {}", entry.path.display(), e);
                stats.hash_failures += 1;
                continue;
            }
        };
        stats.hashed += 1;

        if sender.send(FileRecord::from_entry(entry, hash)).is_err() {
            debug!("Record queue closed, stopping producer");
            break;
        }
    }

    stats
}
