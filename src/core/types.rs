//! Core value types used throughout the snitch library.
//!
//! This module defines [`Sample`], the unit of work every provider
//! watches, together with the equality rules used for de-duplication.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A monitored artifact, identified by its content hash.
///
/// The name is descriptive only: two samples with the same hash are the
/// same sample, whatever they are called. `PartialEq` and `Hash` follow
/// that rule so a `Sample` can be used directly as a set or map key.
///
/// # Examples
///
/// ```rust
/// use snitch::core::Sample;
///
/// let a = Sample::new("implant.exe", "44d88612fea8a8f36de82e1278abb02f");
/// let b = Sample::new("renamed.bin", "44d88612fea8a8f36de82e1278abb02f");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Sample {
    name: String,
    hash: String,
}

impl Sample {
    /// Creates a new sample from a display name and a content hash.
    pub fn new(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
        }
    }

    /// Returns the descriptive name of the sample.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the content hash that identifies the sample.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl PartialEq for Sample {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Hash for Sample {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.hash)
    }
}
