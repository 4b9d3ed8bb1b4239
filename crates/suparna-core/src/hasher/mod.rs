pub mod stream;

use serde::Deserialize;
use std::fmt;

pub use stream::{hash_bytes, hash_file, hash_reader, CHUNK_SIZE};

/// Content digest used as the cheap content-equality proxy.
///
/// Neither variant is relied on for collision resistance; `Blake3` only
/// widens the digest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    XxHash64,
    Blake3,
}

impl HashAlgorithm {
    /// Length of the hex digest produced by this algorithm.
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::XxHash64 => 16,
            HashAlgorithm::Blake3 => 64,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::XxHash64 => write!(f, "xxhash64"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}
