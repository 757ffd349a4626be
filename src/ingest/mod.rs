//! Helpers that turn files on disk into [`Sample`]s.
//!
//! Feeding the coordinator is the caller's business; this module covers
//! the common case of watching every file in one directory.

mod hasher;

pub use hasher::SampleHasher;

use crate::core::{Sample, SnitchResult};
use std::path::Path;

/// Hashes every regular file directly inside `dir`.
///
/// Subdirectories are not descended into. Samples are named after the file
/// name and returned sorted by it.
pub fn hash_directory(dir: impl AsRef<Path>) -> SnitchResult<Vec<Sample>> {
    let dir = dir.as_ref();
    let hasher = SampleHasher::new();

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();

    let mut samples = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let hash = hasher.hash_file(&path)?;
        tracing::debug!(sample = %name, hash = %hash, "Hashed sample");
        samples.push(Sample::new(name, hash));
    }

    Ok(samples)
}
