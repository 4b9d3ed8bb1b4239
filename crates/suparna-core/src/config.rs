use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

use crate::hasher::HashAlgorithm;

pub const DEFAULT_DB_PATH: &str = "suparna.db";
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: String,
    pub root_paths: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub hash_algorithm: HashAlgorithm,
    /// Records allowed in flight between the hashing thread and the writer.
    pub queue_capacity: usize,
    /// Records per committed transaction.
    pub batch_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            hash_algorithm: HashAlgorithm::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Load `Config.*` from the working directory (if present), overridden by
/// `SUPARNA_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(Environment::with_prefix("SUPARNA"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Load an explicit configuration file, still overridden by `SUPARNA_*`
/// environment variables.
pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::from(path))
        .add_source(Environment::with_prefix("SUPARNA"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for dir in dirs {
        let dir_path = Path::new(&dir);

        if result.iter().any(|kept| dir_path.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !Path::new(kept).starts_with(dir_path));
        result.push(dir);
    }

    result
}
