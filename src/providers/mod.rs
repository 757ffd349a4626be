//! Reputation provider implementations.
//!
//! This module contains implementations of the `Provider` trait for
//! various threat-intel services.
//!
//! ## Available Providers
//!
//! - [`mock`] - A scripted provider for testing
//! - [`virustotal`] - VirusTotal v3 API (requires `virustotal` feature)
//! - [`xforce`] - IBM X-Force Exchange API (requires `xforce` feature)
//!
//! ## Implementing a Custom Provider
//!
//! Embed a [`PendingList`](crate::core::PendingList), return it from
//! `pending()`, and answer `scan` with `Ok(None)` for hashes the backend
//! has never seen:
//!
//! ```rust,ignore
//! use snitch::core::{PendingList, Provider, Sample, ScanError, ScanResult};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! #[derive(Debug, Default)]
//! pub struct MyProvider {
//!     pending: PendingList,
//! }
//!
//! #[async_trait]
//! impl Provider for MyProvider {
//!     fn name(&self) -> &str {
//!         "my-provider"
//!     }
//!
//!     fn pending(&self) -> &PendingList {
//!         &self.pending
//!     }
//!
//!     fn threshold(&self) -> Duration {
//!         Duration::from_secs(60)
//!     }
//!
//!     fn max_requests(&self) -> usize {
//!         10
//!     }
//!
//!     async fn scan(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError> {
//!         todo!()
//!     }
//! }
//! ```

pub mod mock;

#[cfg(any(feature = "virustotal", feature = "xforce"))]
mod http;

#[cfg(feature = "virustotal")]
pub mod virustotal;

#[cfg(feature = "xforce")]
pub mod xforce;

// Re-exports
pub use mock::{MockProvider, MockResponse};

#[cfg(feature = "virustotal")]
pub use virustotal::{VirusTotalConfig, VirusTotalProvider};

#[cfg(feature = "xforce")]
pub use xforce::{XForceConfig, XForceProvider};
