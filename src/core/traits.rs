//! Core traits for the snitch library.
//!
//! This module defines the `Provider` trait that every reputation backend
//! must implement.

use crate::core::error::ScanError;
use crate::core::pending::PendingList;
use crate::core::result::ScanResult;
use crate::core::types::Sample;

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// A reputation backend that can be asked whether it knows a hash.
///
/// A provider owns the list of samples it still has to check and the rate
/// parameters of its upstream API. The scan loop drives it; the
/// coordinator only adds and removes samples.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; the pending list is touched
///   from the ingestion task, the provider's own loop and result handlers.
/// - `scan` must report "never seen" as `Ok(None)`. Errors are reserved for
///   failed queries (network, credentials, quota, unparseable answers) and
///   make the loop retry the sample on its next round.
/// - `add`, `remove` and `samples` default to the embedded [`PendingList`].
///
/// # Example Implementation
///
/// ```rust,ignore
/// use snitch::core::{PendingList, Provider, Sample, ScanError, ScanResult};
/// use async_trait::async_trait;
/// use std::time::Duration;
///
/// #[derive(Debug, Default)]
/// struct MyProvider {
///     pending: PendingList,
/// }
///
/// #[async_trait]
/// impl Provider for MyProvider {
///     fn name(&self) -> &str {
///         "my-provider"
///     }
///
///     fn pending(&self) -> &PendingList {
///         &self.pending
///     }
///
///     fn threshold(&self) -> Duration {
///         Duration::from_secs(60)
///     }
///
///     fn max_requests(&self) -> usize {
///         4
///     }
///
///     async fn scan(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError> {
///         // Query the backend...
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Returns the name of this provider.
    ///
    /// The name is the registry key and must be stable.
    fn name(&self) -> &str;

    /// Returns the pending list owned by this provider.
    fn pending(&self) -> &PendingList;

    /// Returns the cool-down to observe after each batch.
    fn threshold(&self) -> Duration;

    /// Returns how many queries may be issued per batch.
    fn max_requests(&self) -> usize;

    /// Queries the provider for one sample.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(result))` - The provider knows the sample.
    /// * `Ok(None)` - The provider has not seen the sample yet.
    /// * `Err(ScanError)` - The query itself failed.
    async fn scan(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError>;

    /// Queues a sample for scanning. Does not scan it.
    fn add(&self, sample: Sample) {
        self.pending().push(sample);
    }

    /// Drops every pending entry with the sample's hash.
    fn remove(&self, sample: &Sample) {
        self.pending().remove(sample);
    }

    /// Returns a snapshot of the pending samples.
    fn samples(&self) -> Vec<Sample> {
        self.pending().snapshot()
    }
}

/// An arc-wrapped provider for shared ownership.
pub type ArcProvider = std::sync::Arc<dyn Provider>;
