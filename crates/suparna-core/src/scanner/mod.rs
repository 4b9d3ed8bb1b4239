pub mod walk;

use chrono::{DateTime, Utc};
use std::path::PathBuf;

pub use walk::Walker;

/// One regular file found by the walker, before hashing.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}
