use crate::scanner::FileEntry;
use chrono::{DateTime, Utc};

/// A hashed file on its way to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub name: String,
    pub path: String,
    pub size: i64,
    pub modified_time: DateTime<Utc>,
    pub hash: String,
}

impl FileRecord {
    pub fn from_entry(entry: FileEntry, hash: String) -> Self {
        Self {
            name: entry.name,
            path: entry.path.to_string_lossy().into_owned(),
            size: i64::try_from(entry.size).unwrap_or(i64::MAX),
            modified_time: entry.modified,
            hash,
        }
    }
}

/// A row of the `files` relation: an original.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub modified_time: DateTime<Utc>,
    pub hash: String,
}

/// A row of the `duplicates` relation, pointing at the original it matched.
#[derive(Debug, Clone)]
pub struct DuplicateRecord {
    pub id: i64,
    pub original_file_id: i64,
    pub name: String,
    pub path: String,
    pub size: i64,
    pub modified_time: DateTime<Utc>,
    pub hash: String,
}

#[derive(Debug, Clone)]
pub struct DuplicateListing {
    pub duplicate: DuplicateRecord,
    pub original_path: String,
}

/// How a record was classified when it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Original { id: i64 },
    Duplicate { id: i64, original_id: i64 },
}

impl PersistOutcome {
    pub fn id(&self) -> i64 {
        match *self {
            PersistOutcome::Original { id } | PersistOutcome::Duplicate { id, .. } => id,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, PersistOutcome::Duplicate { .. })
    }
}
