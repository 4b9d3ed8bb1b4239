use super::models::{FileRecord, PersistOutcome};
use super::queries::persist_record;
use super::sqlite::Database;
use rusqlite::{Connection, Result};
use tracing::{debug, warn};

/// Writes records inside transactions that are committed every
/// `batch_size` records. A committed batch is the unit of durability:
/// dropping the writer without [`BatchWriter::finish`] rolls back only the
/// open batch.
pub struct BatchWriter<'a> {
    conn: &'a Connection,
    batch_size: usize,
    pending: usize,
    written: usize,
}

impl<'a> BatchWriter<'a> {
    pub fn begin(db: &'a Database, batch_size: usize) -> Result<Self> {
        let conn = db.connection();
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            batch_size: batch_size.max(1),
            pending: 0,
            written: 0,
        })
    }

    /// Classify and write one record. A failure here leaves the open
    /// transaction usable for the next record.
    pub fn persist(&mut self, record: &FileRecord) -> Result<PersistOutcome> {
        self.pending += 1;
        let outcome = persist_record(self.conn, record)?;
        self.written += 1;
        Ok(outcome)
    }

    /// Commit and reopen the transaction once the batch is full.
    pub fn commit_if_full(&mut self) -> Result<bool> {
        if self.pending < self.batch_size {
            return Ok(false);
        }
        self.conn.execute_batch("COMMIT; BEGIN")?;
        debug!("Committed batch of {} records", self.pending);
        self.pending = 0;
        Ok(true)
    }

    /// Commit the open batch. Returns the number of rows written overall.
    pub fn finish(self) -> Result<usize> {
        self.conn.execute_batch("COMMIT")?;
        debug!("Committed final batch of {} records", self.pending);
        Ok(self.written)
    }
}

impl Drop for BatchWriter<'_> {
    fn drop(&mut self) {
        if !self.conn.is_autocommit() {
            warn!("Rolling back uncommitted batch of {} records", self.pending);
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback failed: {}", e);
            }
        }
    }
}
