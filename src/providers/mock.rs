//! Mock provider for testing.
//!
//! `MockProvider` answers from a per-hash script instead of a remote API,
//! which makes rounds, failures and late detections reproducible.

use crate::core::{PendingList, Provider, Sample, ScanError, ScanResult};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// What a [`MockProvider`] answers for a hash.
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// The provider knows the sample.
    Flagged {
        /// Reported last-seen timestamp.
        last_seen: DateTime<Utc>,
    },
    /// The provider has never seen the sample.
    Unknown,
    /// The query fails with a transient error.
    Fail,
}

impl MockResponse {
    /// A detection stamped with the current time.
    pub fn flagged_now() -> Self {
        Self::Flagged {
            last_seen: Utc::now(),
        }
    }
}

/// A scripted provider.
///
/// # Examples
///
/// ```rust
/// use snitch::providers::{MockProvider, MockResponse};
/// use std::time::Duration;
///
/// // Knows nothing, except one hash
/// let provider = MockProvider::new()
///     .with_name("vt-mock")
///     .with_threshold(Duration::from_secs(1))
///     .with_response("44d88612fea8a8f36de82e1278abb02f", MockResponse::flagged_now());
/// ```
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    pending: PendingList,
    responses: RwLock<HashMap<String, MockResponse>>,
    default_response: MockResponse,
    threshold: Duration,
    max_requests: usize,
    latency: Option<Duration>,
    scan_count: AtomicU64,
    scans_by_hash: RwLock<HashMap<String, u64>>,
}

impl MockProvider {
    /// Creates a mock that knows no sample, with a 1 s threshold and
    /// batches of 4.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            pending: PendingList::new(),
            responses: RwLock::new(HashMap::new()),
            default_response: MockResponse::Unknown,
            threshold: Duration::from_secs(1),
            max_requests: 4,
            latency: None,
            scan_count: AtomicU64::new(0),
            scans_by_hash: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the provider name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the cool-down between batches.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the batch size.
    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Sets the answer for hashes without a scripted response.
    pub fn with_default_response(mut self, response: MockResponse) -> Self {
        self.default_response = response;
        self
    }

    /// Scripts the answer for one hash.
    pub fn with_response(self, hash: impl Into<String>, response: MockResponse) -> Self {
        self.set_response(hash, response);
        self
    }

    /// Sets a simulated query latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Scripts the answer for one hash on a live provider, e.g. to burn a
    /// sample halfway through a run.
    pub fn set_response(&self, hash: impl Into<String>, response: MockResponse) {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(hash.into(), response);
    }

    /// Returns the total number of queries made.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Returns how many times one hash was queried.
    pub fn scans_of(&self, hash: &str) -> u64 {
        self.scans_by_hash
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(hash)
            .copied()
            .unwrap_or(0)
    }

    fn response_for(&self, hash: &str) -> MockResponse {
        self.responses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(hash)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn pending(&self) -> &PendingList {
        &self.pending
    }

    fn threshold(&self) -> Duration {
        self.threshold
    }

    fn max_requests(&self) -> usize {
        self.max_requests
    }

    async fn scan(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError> {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        *self
            .scans_by_hash
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(sample.hash().to_string())
            .or_insert(0) += 1;

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.response_for(sample.hash()) {
            MockResponse::Flagged { last_seen } => Ok(Some(ScanResult::new(
                sample.clone(),
                self.name.clone(),
                last_seen,
            ))),
            MockResponse::Unknown => Ok(None),
            MockResponse::Fail => Err(ScanError::provider_unavailable(
                &self.name,
                "simulated failure",
            )),
        }
    }
}
