//! VirusTotal provider.
//!
//! Looks hashes up with the VirusTotal v3 API. A file VirusTotal has never
//! received answers 404; anything it has received is considered burned,
//! with its last submission date as the detection timestamp.
//!
//! # Requirements
//!
//! - VirusTotal API key
//! - Network access to www.virustotal.com

use crate::core::{PendingList, Provider, Sample, ScanError, ScanResult};
use crate::providers::http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Public API quota: 4 lookups per minute.
pub const VT_MAX_REQUESTS: usize = 4;

/// Cool-down between batches. The free tier also caps lookups at 500 a
/// day, hence twice the per-minute window.
pub const VT_THRESHOLD: Duration = Duration::from_secs(2 * 60);

/// VirusTotal provider configuration.
#[derive(Debug, Clone)]
pub struct VirusTotalConfig {
    /// Provider name used as the registry key.
    pub name: String,

    /// API key (kept secret).
    pub api_key: SecretString,

    /// Base URL for the API.
    pub base_url: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Lookups per batch.
    pub max_requests: usize,

    /// Cool-down after each batch.
    pub threshold: Duration,
}

impl VirusTotalConfig {
    /// Creates a new configuration with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            name: "virustotal".to_string(),
            api_key: SecretString::new(api_key.into().into()),
            base_url: "https://www.virustotal.com/api/v3".to_string(),
            timeout: Duration::from_secs(30),
            max_requests: VT_MAX_REQUESTS,
            threshold: VT_THRESHOLD,
        }
    }

    /// Reads the API key from `VT_API_KEY`.
    pub fn from_env() -> Result<Self, ScanError> {
        match std::env::var("VT_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(ScanError::configuration("VT_API_KEY is not set")),
        }
    }

    /// Sets the provider name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of lookups per batch (premium keys allow more).
    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests.max(1);
        self
    }

    /// Sets the cool-down after each batch.
    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }
}

/// VirusTotal provider implementation.
///
/// # Example
///
/// ```rust,ignore
/// use snitch::providers::virustotal::{VirusTotalConfig, VirusTotalProvider};
///
/// let provider = VirusTotalProvider::new(VirusTotalConfig::from_env()?)?;
/// ```
#[derive(Debug)]
pub struct VirusTotalProvider {
    config: VirusTotalConfig,
    pending: PendingList,
    client: reqwest::Client,
}

impl VirusTotalProvider {
    /// Creates a new VirusTotal provider.
    pub fn new(config: VirusTotalConfig) -> Result<Self, ScanError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(ScanError::configuration("VirusTotal API key is empty"));
        }
        let client = http::build_client(&config.name, config.timeout)?;

        Ok(Self {
            config,
            pending: PendingList::new(),
            client,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &VirusTotalConfig {
        &self.config
    }
}

/// Extracts `data.attributes.last_submission_date` (unix seconds).
fn parse_last_seen(provider: &str, body: &serde_json::Value) -> Result<DateTime<Utc>, ScanError> {
    let seconds = body
        .pointer("/data/attributes/last_submission_date")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| ScanError::malformed(provider, "missing last_submission_date"))?;

    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| ScanError::malformed(provider, format!("invalid timestamp {seconds}")))
}

#[async_trait]
impl Provider for VirusTotalProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn pending(&self) -> &PendingList {
        &self.pending
    }

    fn threshold(&self) -> Duration {
        self.config.threshold
    }

    fn max_requests(&self) -> usize {
        self.config.max_requests
    }

    async fn scan(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError> {
        let url = format!("{}/files/{}", self.config.base_url, sample.hash());

        let response = self
            .client
            .get(&url)
            .header("x-apikey", self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| http::transport_error(self.name(), e))?;

        let Some(body) = http::lookup_body(self.name(), response).await? else {
            return Ok(None);
        };

        let last_seen = parse_last_seen(self.name(), &body)?;
        Ok(Some(ScanResult::new(sample.clone(), self.name(), last_seen)))
    }
}
