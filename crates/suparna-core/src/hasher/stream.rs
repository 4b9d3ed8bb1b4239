use super::HashAlgorithm;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use twox_hash::XxHash64;

pub const CHUNK_SIZE: usize = 4096; // 4KB

enum Digester {
    XxHash64(XxHash64),
    Blake3(Box<blake3::Hasher>),
}

impl Digester {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::XxHash64 => Digester::XxHash64(XxHash64::with_seed(0)),
            HashAlgorithm::Blake3 => Digester::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Digester::XxHash64(hasher) => hasher.write(data),
            Digester::Blake3(hasher) => {
                hasher.update(data);
            }
        }
    }

    fn finish_hex(self) -> String {
        match self {
            Digester::XxHash64(hasher) => format!("{:016x}", hasher.finish()),
            Digester::Blake3(hasher) => hasher.finalize().to_hex().to_string(),
        }
    }
}

/// Hash a file's content without loading it into memory.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> io::Result<String> {
    let file = File::open(path)?;
    hash_reader(file, algorithm)
}

/// Stream `reader` through the digest in `CHUNK_SIZE` pieces.
///
/// A read error partway through drops the partial digest and returns the
/// error; an empty or placeholder digest is never produced.
pub fn hash_reader<R: Read>(mut reader: R, algorithm: HashAlgorithm) -> io::Result<String> {
    let mut digester = Digester::new(algorithm);
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        digester.update(&buffer[..bytes_read]);
    }

    Ok(digester.finish_hex())
}

/// One-shot digest of an in-memory buffer.
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> String {
    let mut digester = Digester::new(algorithm);
    digester.update(data);
    digester.finish_hex()
}
