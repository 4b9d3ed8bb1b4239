use super::FileEntry;
use chrono::{DateTime, Utc};
use glob::Pattern;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};
use walkdir::{DirEntry, WalkDir};

/// Sequential directory traversal yielding regular files only.
///
/// Symlinks are not followed and never emitted. Unreadable entries are
/// logged and skipped. When the abort flag is raised the walk ends
/// quietly at the next entry.
#[derive(Debug)]
pub struct Walker {
    root: PathBuf,
    ignore_patterns: Vec<Pattern>,
    abort_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ignore_patterns: Vec::new(),
            abort_flag: None,
        }
    }

    /// Invalid globs are logged and dropped.
    pub fn with_ignore_patterns(mut self, globs: &[String]) -> Self {
        self.ignore_patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn with_abort_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.abort_flag = Some(flag);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_aborted(&self) -> bool {
        self.abort_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }

    fn regular_files(&self) -> RegularFiles<'_> {
        RegularFiles {
            walker: self,
            inner: WalkDir::new(&self.root).follow_links(false).into_iter(),
            done: false,
        }
    }

    /// Lazily enumerate regular files under the root.
    pub fn walk(&self) -> impl Iterator<Item = FileEntry> + '_ {
        self.regular_files().filter_map(describe)
    }

    /// Dry pass over the tree with the same filtering as [`Walker::walk`].
    ///
    /// This is a separate traversal; if the tree changes before the real
    /// walk the count can be stale.
    pub fn count_files(&self) -> usize {
        self.regular_files().count()
    }
}

struct RegularFiles<'w> {
    walker: &'w Walker,
    inner: walkdir::IntoIter,
    done: bool,
}

impl Iterator for RegularFiles<'_> {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        while !self.done {
            if self.walker.is_aborted() {
                debug!("Walk of {} aborted", self.walker.root.display());
                self.done = true;
                break;
            }

            let entry = match self.inner.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => {
                    warn!(
                        "Skipping unreadable entry {}: {}",
                        err.path().map(|p| p.display().to_string()).unwrap_or_default(),
                        err
                    );
                    continue;
                }
                None => {
                    self.done = true;
                    break;
                }
            };

            if self.walker.is_ignored(entry.path()) {
                if entry.file_type().is_dir() {
                    self.inner.skip_current_dir();
                }
                continue;
            }

            if entry.file_type().is_file() {
                return Some(entry);
            }
        }
        None
    }
}

fn describe(entry: DirEntry) -> Option<FileEntry> {
    let metadata = match entry.metadata() {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!(
                "Error getting metadata for {}: {}",
                entry.path().display(),
                err
            );
            return None;
        }
    };

    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Some(FileEntry {
        name: entry.file_name().to_string_lossy().into_owned(),
        path: entry.into_path(),
        size: metadata.len(),
        modified,
    })
}
