//! IBM X-Force Exchange provider.
//!
//! Looks hashes up in the X-Force malware database. The `created` date of
//! the malware record is used as the detection timestamp.

use crate::core::{PendingList, Provider, Sample, ScanError, ScanResult};
use crate::providers::http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Lookups per batch on the free tier.
pub const XFORCE_MAX_REQUESTS: usize = 6;

/// The free tier allows about 5000 lookups a month, roughly 7 an hour.
pub const XFORCE_THRESHOLD: Duration = Duration::from_secs(10 * 60);

/// X-Force provider configuration.
#[derive(Debug, Clone)]
pub struct XForceConfig {
    /// Provider name used as the registry key.
    pub name: String,

    /// API key.
    pub api_key: String,

    /// API password (kept secret).
    pub api_password: SecretString,

    /// Base URL for the API.
    pub base_url: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Lookups per batch.
    pub max_requests: usize,

    /// Cool-down after each batch.
    pub threshold: Duration,
}

impl XForceConfig {
    /// Creates a new configuration from an API key/password pair.
    pub fn new(api_key: impl Into<String>, api_password: impl Into<String>) -> Self {
        Self {
            name: "xforce".to_string(),
            api_key: api_key.into(),
            api_password: SecretString::new(api_password.into().into()),
            base_url: "https://api.xforce.ibmcloud.com".to_string(),
            timeout: Duration::from_secs(30),
            max_requests: XFORCE_MAX_REQUESTS,
            threshold: XFORCE_THRESHOLD,
        }
    }

    /// Reads the credentials from `XFORCE_API_KEY` and `XFORCE_API_PASSWORD`.
    pub fn from_env() -> Result<Self, ScanError> {
        let key = std::env::var("XFORCE_API_KEY")
            .map_err(|_| ScanError::configuration("XFORCE_API_KEY is not set"))?;
        let password = std::env::var("XFORCE_API_PASSWORD")
            .map_err(|_| ScanError::configuration("XFORCE_API_PASSWORD is not set"))?;
        Ok(Self::new(key, password))
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

    /// Sets the number of lookups per batch.
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

/// X-Force provider implementation.
#[derive(Debug)]
pub struct XForceProvider {
    config: XForceConfig,
    pending: PendingList,
    client: reqwest::Client,
}

impl XForceProvider {
    /// Creates a new X-Force provider.
    pub fn new(config: XForceConfig) -> Result<Self, ScanError> {
        if config.api_key.is_empty() || config.api_password.expose_secret().is_empty() {
            return Err(ScanError::configuration("X-Force credentials are incomplete"));
        }
        let client = http::build_client(&config.name, config.timeout)?;

        Ok(Self {
            config,
            pending: PendingList::new(),
            client,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &XForceConfig {
        &self.config
    }
}

/// Extracts `malware.created` (RFC 3339).
fn parse_created(provider: &str, body: &serde_json::Value) -> Result<DateTime<Utc>, ScanError> {
    let created = body
        .pointer("/malware/created")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScanError::malformed(provider, "missing malware.created"))?;

    DateTime::parse_from_rfc3339(created)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ScanError::malformed(provider, format!("invalid created date: {e}")))
}

#[async_trait]
impl Provider for XForceProvider {
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
        let url = format!("{}/malware/{}", self.config.base_url, sample.hash());

        let response = self
            .client
            .get(&url)
            .basic_auth(
                &self.config.api_key,
                Some(self.config.api_password.expose_secret()),
            )
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| http::transport_error(self.name(), e))?;

        let Some(body) = http::lookup_body(self.name(), response).await? else {
            return Ok(None);
        };

        let last_seen = parse_created(self.name(), &body)?;
        Ok(Some(ScanResult::new(sample.clone(), self.name(), last_seen)))
    }
}
