//! Scan result structures.
//!
//! A [`ScanResult`] only exists for positive detections: a provider that
//! has never seen a sample answers with `Ok(None)` instead.

use crate::core::types::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A positive detection reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    sample: Sample,
    provider: String,
    last_seen: DateTime<Utc>,
}

impl ScanResult {
    /// Creates a new `ScanResult`.
    ///
    /// `last_seen` is the provider's own timestamp for the sample (for
    /// example the last submission date), not the time of the query.
    pub fn new(sample: Sample, provider: impl Into<String>, last_seen: DateTime<Utc>) -> Self {
        Self {
            sample,
            provider: provider.into(),
            last_seen,
        }
    }

    /// Returns the flagged sample.
    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    /// Returns the name of the provider that flagged the sample.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns when the provider last saw the sample.
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    /// Shortcut for the flagged sample's hash.
    pub fn hash(&self) -> &str {
        self.sample.hash()
    }
}
