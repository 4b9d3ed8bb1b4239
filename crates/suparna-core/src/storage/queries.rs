use super::models::*;
use super::sqlite::Database;
use rusqlite::{params, Connection, Result, Row};
use std::path::{Path, MAIN_SEPARATOR};

/// `path` prefix that selects everything strictly beneath `root`.
///
/// Always ends in a separator so `/data/a` never matches `/data/ab/...`.
pub fn root_prefix(root: &Path) -> String {
    let mut prefix = root.to_string_lossy().into_owned();
    if !prefix.ends_with(MAIN_SEPARATOR) {
        prefix.push(MAIN_SEPARATOR);
    }
    prefix
}

// ── Classification ───────────────────────────────────────────

/// Id of the earliest stored file sharing the record's name OR hash.
pub fn find_original(conn: &Connection, name: &str, hash: &str) -> Result<Option<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM files WHERE name = ?1 OR hash = ?2 ORDER BY id LIMIT 1",
    )?;
    match stmt.query_row(params![name, hash], |row| row.get(0)) {
        Ok(id) => Ok(Some(id)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn insert_file(conn: &Connection, record: &FileRecord) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO files (name, path, size, modified_time, hash) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    stmt.execute(params![
        record.name,
        record.path,
        record.size,
        record.modified_time,
        record.hash,
    ])?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_duplicate(conn: &Connection, original_id: i64, record: &FileRecord) -> Result<i64> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO duplicates (original_file_id, name, path, size, modified_time, hash) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    stmt.execute(params![
        original_id,
        record.name,
        record.path,
        record.size,
        record.modified_time,
        record.hash,
    ])?;
    Ok(conn.last_insert_rowid())
}

/// Store one record, as a new original or as a duplicate of an existing one.
///
/// A name match alone is enough to make a duplicate, as is a hash match
/// alone. Lookup and insert are not atomic by themselves: callers must keep
/// a single writer per store.
pub fn persist_record(conn: &Connection, record: &FileRecord) -> Result<PersistOutcome> {
    match find_original(conn, &record.name, &record.hash)? {
        Some(original_id) => {
            let id = insert_duplicate(conn, original_id, record)?;
            Ok(PersistOutcome::Duplicate { id, original_id })
        }
        None => {
            let id = insert_file(conn, record)?;
            Ok(PersistOutcome::Original { id })
        }
    }
}

fn stored_file_from_row(row: &Row<'_>) -> Result<StoredFile> {
    Ok(StoredFile {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        size: row.get(3)?,
        modified_time: row.get(4)?,
        hash: row.get(5)?,
    })
}

fn duplicate_from_row(row: &Row<'_>) -> Result<DuplicateRecord> {
    Ok(DuplicateRecord {
        id: row.get(0)?,
        original_file_id: row.get(1)?,
        name: row.get(2)?,
        path: row.get(3)?,
        size: row.get(4)?,
        modified_time: row.get(5)?,
        hash: row.get(6)?,
    })
}

impl Database {
    /// Classify and store a single record outside of any batch.
    pub fn persist(&self, record: &FileRecord) -> Result<PersistOutcome> {
        persist_record(self.connection(), record)
    }

    // ── Files ────────────────────────────────────────────────────

    /// Rows beneath `root` in either `files` or `duplicates`.
    pub fn count_files_under(&self, root: &Path) -> Result<i64> {
        let prefix = root_prefix(root);
        self.connection().query_row(
            "SELECT (SELECT COUNT(*) FROM files WHERE substr(path, 1, ?2) = ?1) \
                  + (SELECT COUNT(*) FROM duplicates WHERE substr(path, 1, ?2) = ?1)",
            params![prefix, prefix.chars().count() as i64],
            |row| row.get(0),
        )
    }

    pub fn file_count(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
    }

    pub fn get_file(&self, id: i64) -> Result<Option<StoredFile>> {
        match self.connection().query_row(
            "SELECT id, name, path, size, modified_time, hash FROM files WHERE id = ?1",
            params![id],
            stored_file_from_row,
        ) {
            Ok(file) => Ok(Some(file)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn files_under(&self, root: &Path, offset: i64, limit: i64) -> Result<Vec<StoredFile>> {
        let prefix = root_prefix(root);
        let mut stmt = self.connection().prepare(
            "SELECT id, name, path, size, modified_time, hash FROM files \
             WHERE substr(path, 1, ?2) = ?1 \
             ORDER BY modified_time DESC LIMIT ?3 OFFSET ?4",
        )?;
        let files = stmt
            .query_map(
                params![prefix, prefix.chars().count() as i64, limit, offset],
                stored_file_from_row,
            )?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    /// Files whose name contains `keyword`, most recently modified first.
    pub fn search_files(&self, keyword: &str, limit: i64) -> Result<Vec<StoredFile>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, name, path, size, modified_time, hash FROM files \
             WHERE instr(name, ?1) > 0 \
             ORDER BY modified_time DESC LIMIT ?2",
        )?;
        let files = stmt
            .query_map(params![keyword, limit], stored_file_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(files)
    }

    // ── Duplicates ───────────────────────────────────────────────

    pub fn duplicate_count(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM duplicates", [], |row| row.get(0))
    }

    pub fn duplicates_of(&self, original_id: i64) -> Result<Vec<DuplicateRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, original_file_id, name, path, size, modified_time, hash \
             FROM duplicates WHERE original_file_id = ?1 ORDER BY id",
        )?;
        let duplicates = stmt
            .query_map(params![original_id], duplicate_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(duplicates)
    }

    pub fn list_duplicates(&self, offset: i64, limit: i64) -> Result<Vec<DuplicateListing>> {
        let mut stmt = self.connection().prepare(
            "SELECT d.id, d.original_file_id, d.name, d.path, d.size, d.modified_time, d.hash, \
                    f.path \
             FROM duplicates d \
             JOIN files f ON f.id = d.original_file_id \
             ORDER BY d.id LIMIT ?1 OFFSET ?2",
        )?;
        let listings = stmt
            .query_map(params![limit, offset], |row| {
                Ok(DuplicateListing {
                    duplicate: duplicate_from_row(row)?,
                    original_path: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_prefix_appends_separator_once() {
        let with = root_prefix(Path::new(&format!("{0}data{0}", MAIN_SEPARATOR)));
        let without = root_prefix(Path::new(&format!("{0}data", MAIN_SEPARATOR)));
        assert_eq!(with, without);
        assert!(with.ends_with(MAIN_SEPARATOR));
    }
}
