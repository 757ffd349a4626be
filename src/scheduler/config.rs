//! Coordinator and scan loop configuration.

use std::time::Duration;

/// Configuration for a provider's scan loop.
#[derive(Debug, Clone)]
pub struct ScanLoopConfig {
    /// Upper bound for a single provider query. `None` waits forever.
    pub scan_timeout: Option<Duration>,
}

impl Default for ScanLoopConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl ScanLoopConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-query timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = Some(timeout);
        self
    }

    /// Disables the per-query timeout.
    pub fn without_scan_timeout(mut self) -> Self {
        self.scan_timeout = None;
        self
    }
}

/// Configuration for the [`Snitch`](super::Snitch) coordinator.
#[derive(Debug, Clone)]
pub struct SnitchConfig {
    /// Capacity of the ingestion channel. `add` only waits once this many
    /// samples are queued ahead of the fan-out task. Zero is treated as 1.
    pub ingest_capacity: usize,

    /// Settings applied to every provider's scan loop.
    pub scan_loop: ScanLoopConfig,
}

impl Default for SnitchConfig {
    fn default() -> Self {
        Self {
            ingest_capacity: 1024,
            scan_loop: ScanLoopConfig::default(),
        }
    }
}

impl SnitchConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ingestion channel capacity.
    pub fn with_ingest_capacity(mut self, capacity: usize) -> Self {
        self.ingest_capacity = capacity;
        self
    }

    /// Sets the scan loop configuration.
    pub fn with_scan_loop(mut self, scan_loop: ScanLoopConfig) -> Self {
        self.scan_loop = scan_loop;
        self
    }

    /// Sets the per-query timeout of every scan loop.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_loop.scan_timeout = Some(timeout);
        self
    }
}
