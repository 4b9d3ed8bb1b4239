pub mod models;
pub mod queries;
pub mod sqlite;
pub mod writer;

pub use models::{DuplicateListing, DuplicateRecord, FileRecord, PersistOutcome, StoredFile};
pub use queries::persist_record;
pub use sqlite::Database;
pub use writer::BatchWriter;
