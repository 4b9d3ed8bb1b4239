use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

use suparna_core::engine::ALREADY_INDEXED_MESSAGE;
use suparna_core::storage::Database;
use suparna_core::{AppConfig, Error, ScanEngine, ScanStatus, SilentReporter};

/// Engine writing to a fresh on-disk database outside the scanned tree.
fn engine_with_db(config: AppConfig) -> (ScanEngine, TempDir, String) {
    let db_dir = tempdir().unwrap();
    let db_path = db_dir
        .path()
        .join("index.db")
        .to_string_lossy()
        .into_owned();
    let engine = ScanEngine::new(config).with_db_path(&db_path);
    (engine, db_dir, db_path)
}

/// Collects every progress callback.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(String, f64)>>,
}

impl Recorder {
    fn calls(&self) -> Vec<(String, f64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl suparna_core::ProgressReporter for Recorder {
    fn on_progress(&self, current_file: &str, fraction: f64) {
        self.calls
            .lock()
            .unwrap()
            .push((current_file.to_string(), fraction));
    }
}

/// Layout:
///   root/
///     folder_a/
///       unique_a.txt     ("unique content a")
///       shared_a.txt     ("shared content xyz")
///     folder_b/
///       unique_b.txt     ("unique content b")
///       shared_b.txt     ("shared content xyz")  ← same bytes as shared_a.txt
fn create_test_tree(root: &Path) {
    let folder_a = root.join("folder_a");
    let folder_b = root.join("folder_b");
    fs::create_dir_all(&folder_a).unwrap();
    fs::create_dir_all(&folder_b).unwrap();

    fs::write(folder_a.join("unique_a.txt"), "unique content a").unwrap();
    fs::write(folder_b.join("unique_b.txt"), "unique content b").unwrap();
    fs::write(folder_a.join("shared_a.txt"), "shared content xyz").unwrap();
    fs::write(folder_b.join("shared_b.txt"), "shared content xyz").unwrap();
}

#[test]
fn test_full_scan_pipeline() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_test_tree(&root);

    let (engine, _db_dir, db_path) = engine_with_db(AppConfig::default());
    let recorder = Recorder::default();
    let result = engine.scan(&root, &recorder).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.total_files, 4);
    assert_eq!(result.processed, 4);
    assert_eq!(result.originals, 3);
    assert_eq!(result.duplicates, 1);

    let calls = recorder.calls();
    assert_eq!(calls.len(), 4, "one progress callback per file");
    assert!(calls.windows(2).all(|w| w[0].1 < w[1].1));
    assert_eq!(calls.last().unwrap().1, 1.0);

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.file_count().unwrap(), 3);
    assert_eq!(db.duplicate_count().unwrap(), 1);
    assert!(!engine.state().is_running());
}

#[test]
fn test_idempotent_rescan() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_idempotent");
    create_test_tree(&root);

    let (engine, _db_dir, db_path) = engine_with_db(AppConfig::default());
    let first = engine.scan(&root, &SilentReporter).unwrap();
    assert_eq!(first.status, ScanStatus::Completed);
    let rows_after_first = Database::open(&db_path).unwrap().file_count().unwrap();

    let recorder = Recorder::default();
    let second = engine.scan(&root, &recorder).unwrap();
    assert_eq!(second.status, ScanStatus::AlreadyIndexed);
    assert_eq!(second.processed, 0);
    assert_eq!(
        recorder.calls(),
        vec![(ALREADY_INDEXED_MESSAGE.to_string(), 1.0)]
    );

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.file_count().unwrap(), rows_after_first);
    assert_eq!(db.duplicate_count().unwrap(), 1);
}

#[test]
fn test_rescan_of_duplicate_only_root_is_already_indexed() {
    let tmp = tempdir().unwrap();
    let originals = tmp.path().join("a");
    let copies = tmp.path().join("b");
    fs::create_dir_all(&originals).unwrap();
    fs::create_dir_all(&copies).unwrap();
    fs::write(originals.join("f.txt"), "x").unwrap();
    fs::write(copies.join("g.txt"), "x").unwrap();

    let (engine, _db_dir, db_path) = engine_with_db(AppConfig::default());
    engine.scan(&originals, &SilentReporter).unwrap();

    let first = engine.scan(&copies, &SilentReporter).unwrap();
    assert_eq!(first.status, ScanStatus::Completed);
    assert_eq!(first.duplicates, 1);

    let second = engine.scan(&copies, &SilentReporter).unwrap();
    assert_eq!(second.status, ScanStatus::AlreadyIndexed);

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.file_count().unwrap(), 1);
    assert_eq!(db.duplicate_count().unwrap(), 1);
}

#[test]
fn test_sibling_with_common_prefix_is_not_already_indexed() {
    let tmp = tempdir().unwrap();
    let first = tmp.path().join("photos");
    let sibling = tmp.path().join("photos_backup");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&sibling).unwrap();
    fs::write(first.join("a.jpg"), "aaa").unwrap();
    fs::write(sibling.join("b.jpg"), "bbb").unwrap();

    let (engine, _db_dir, _db_path) = engine_with_db(AppConfig::default());
    engine.scan(&first, &SilentReporter).unwrap();
    let result = engine.scan(&sibling, &SilentReporter).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.originals, 1);
}

#[test]
fn test_content_duplicates_reference_one_original() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("content");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("f1"), "x").unwrap();
    fs::write(root.join("f2"), "x").unwrap();

    let (engine, _db_dir, db_path) = engine_with_db(AppConfig::default());
    engine.scan(&root, &SilentReporter).unwrap();

    let db = Database::open(&db_path).unwrap();
    let files = db.files_under(&root.canonicalize().unwrap(), 0, 10).unwrap();
    assert_eq!(files.len(), 1);
    let dups = db.duplicates_of(files[0].id).unwrap();
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].hash, files[0].hash);
    assert_ne!(dups[0].name, files[0].name);
    assert_eq!(db.duplicate_count().unwrap(), 1);
}

#[test]
fn test_name_collision_is_duplicate_even_with_different_content() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("names");
    fs::create_dir_all(root.join("a")).unwrap();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a").join("report.txt"), "1").unwrap();
    fs::write(root.join("b").join("report.txt"), "2").unwrap();

    let (engine, _db_dir, db_path) = engine_with_db(AppConfig::default());
    let result = engine.scan(&root, &SilentReporter).unwrap();
    assert_eq!(result.originals, 1);
    assert_eq!(result.duplicates, 1);

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.file_count().unwrap(), 1);
    let listings = db.list_duplicates(0, 10).unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].duplicate.name, "report.txt");
    assert_ne!(listings[0].duplicate.path, listings[0].original_path);
}

#[test]
fn test_scan_cancellation() {
    const FILES: usize = 200;
    const ABORT_AFTER: usize = 5;

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_cancel");
    fs::create_dir_all(&root).unwrap();
    for i in 0..FILES {
        fs::write(root.join(format!("file_{i:04}.dat")), format!("content {i}")).unwrap();
    }

    let config = AppConfig {
        queue_capacity: 4,
        batch_size: 3,
        ..AppConfig::default()
    };
    let (engine, _db_dir, db_path) = engine_with_db(config);
    let handle = engine.abort_handle();
    let callbacks = AtomicUsize::new(0);

    let reporter = |_name: &str, _fraction: f64| {
        if callbacks.fetch_add(1, Ordering::SeqCst) + 1 == ABORT_AFTER {
            assert!(handle.abort());
        }
    };
    let result = engine.scan(&root, &reporter).unwrap();

    assert_eq!(result.status, ScanStatus::Aborted);
    assert!(result.is_aborted());
    assert_eq!(
        callbacks.load(Ordering::SeqCst),
        ABORT_AFTER,
        "no progress callbacks once the abort is observed"
    );
    assert_eq!(result.processed, ABORT_AFTER);
    assert!(result.processed <= result.total_files);

    let db = Database::open(&db_path).unwrap();
    let stored = db.file_count().unwrap() + db.duplicate_count().unwrap();
    assert_eq!(stored as usize, ABORT_AFTER);
    assert!(!handle.is_running());
    assert!(!handle.abort(), "abort after the scan is a no-op");
}

#[test]
fn test_abort_then_rescan_starts_fresh() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("restart");
    create_test_tree(&root);

    let (engine, _db_dir, _db_path) = engine_with_db(AppConfig::default());
    assert!(!engine.abort(), "abort while idle does nothing");

    let result = engine.scan(&root, &SilentReporter).unwrap();
    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.processed, 4);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempdir().unwrap();
    let root = tmp.path().join("perm");
    fs::create_dir_all(&root).unwrap();
    for i in 0..9 {
        fs::write(root.join(format!("readable_{i}.txt")), format!("body {i}")).unwrap();
    }
    let locked = root.join("locked.txt");
    fs::write(&locked, "secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::File::open(&locked).is_ok() {
        // Running with privileges that ignore file modes
        return;
    }

    let (engine, _db_dir, db_path) = engine_with_db(AppConfig::default());
    let result = engine.scan(&root, &SilentReporter).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.hash_failures, 1);
    assert_eq!(result.originals, 9);
    assert_eq!(Database::open(&db_path).unwrap().file_count().unwrap(), 9);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[test]
fn test_empty_root() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("empty");
    fs::create_dir_all(root.join("only/dirs/here")).unwrap();

    let (engine, _db_dir, db_path) = engine_with_db(AppConfig::default());
    let recorder = Recorder::default();
    let result = engine.scan(&root, &recorder).unwrap();

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.total_files, 0);
    assert!(recorder.calls().is_empty());
    assert_eq!(Database::open(&db_path).unwrap().file_count().unwrap(), 0);
}

#[test]
fn test_ignore_patterns_and_blake3() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("ignored");
    create_test_tree(&root);

    let config = AppConfig {
        ignore_patterns: vec!["**/folder_b".to_string()],
        hash_algorithm: suparna_core::hasher::HashAlgorithm::Blake3,
        ..AppConfig::default()
    };
    let (engine, _db_dir, db_path) = engine_with_db(config);
    let result = engine.scan(&root, &SilentReporter).unwrap();

    assert_eq!(result.total_files, 2);
    assert_eq!(result.duplicates, 0);
    let db = Database::open(&db_path).unwrap();
    let files = db.search_files("_a.txt", 10).unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.hash.len() == 64));
}

#[test]
fn test_invalid_root_is_structural_error() {
    let tmp = tempdir().unwrap();
    let (engine, _db_dir, _db_path) = engine_with_db(AppConfig::default());

    let missing = engine.scan(&tmp.path().join("does_not_exist"), &SilentReporter);
    assert!(matches!(missing, Err(Error::InvalidRoot { .. })));

    let file = tmp.path().join("plain.txt");
    fs::write(&file, "not a dir").unwrap();
    let not_dir = engine.scan(&file, &SilentReporter);
    assert!(matches!(not_dir, Err(Error::InvalidRoot { .. })));
}

#[test]
fn test_unopenable_database_is_structural_error() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("db_fail");
    create_test_tree(&root);

    let bad_db = tmp.path().join("no_such_dir").join("index.db");
    let engine =
        ScanEngine::new(AppConfig::default()).with_db_path(bad_db.to_str().unwrap());
    let result = engine.scan(&root, &SilentReporter);
    assert!(matches!(result, Err(Error::Database(_))));
    assert!(!engine.state().is_running());
}
