//! MD5 content hashing for sample ingestion.
//!
//! Reputation providers index files by MD5 (among others), so that is the
//! digest samples are keyed on. Output is lowercase hex.

use md5::{Digest, Md5};
use std::io::Read;
use std::path::Path;

/// Computes lowercase-hex MD5 digests of file contents.
///
/// # Examples
///
/// ```rust
/// use snitch::ingest::SampleHasher;
///
/// let hasher = SampleHasher::new();
/// assert_eq!(hasher.hash_bytes(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleHasher;

impl SampleHasher {
    /// Creates a new hasher.
    pub fn new() -> Self {
        Self
    }

    /// Hashes an in-memory buffer.
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        hex::encode(Md5::digest(data))
    }

    /// Hashes everything a reader yields, streaming in 64 KiB chunks.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<String> {
        let mut hasher = Md5::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Hashes a file on disk without loading it whole.
    pub fn hash_file(&self, path: &Path) -> std::io::Result<String> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        self.hash_reader(&mut reader)
    }
}
