//! Lock-protected list of samples waiting to be scanned.

use crate::core::types::Sample;

use std::sync::Mutex;
use tokio::sync::Notify;

/// The pending list a provider owns.
///
/// Every accessor takes the internal lock for the duration of a single
/// operation only, so the lock is never held across an `.await`. Callers
/// get copies, never the protected `Vec` itself.
///
/// `push` raises a wake-up signal that [`PendingList::wait_for_samples`]
/// consumes. A signal raised while nobody waits is remembered, so a sample
/// added between an empty snapshot and the wait is never missed.
#[derive(Debug, Default)]
pub struct PendingList {
    samples: Mutex<Vec<Sample>>,
    added: Notify,
}

impl PendingList {
    /// Creates an empty pending list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample and wakes the waiting scan loop, if any.
    pub fn push(&self, sample: Sample) {
        self.lock().push(sample);
        self.added.notify_one();
    }

    /// Removes every entry carrying the sample's hash.
    ///
    /// Returns the number of entries removed; removing an absent hash is a
    /// no-op that returns 0.
    pub fn remove(&self, sample: &Sample) -> usize {
        let mut samples = self.lock();
        let before = samples.len();
        samples.retain(|s| s.hash() != sample.hash());
        before - samples.len()
    }

    /// Returns a copy of the current list, in insertion order.
    pub fn snapshot(&self) -> Vec<Sample> {
        self.lock().clone()
    }

    /// Returns `true` if an entry with this hash is pending.
    pub fn contains(&self, hash: &str) -> bool {
        self.lock().iter().any(|s| s.hash() == hash)
    }

    /// Returns the number of pending entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Waits until a sample has been pushed since the last wake-up.
    pub async fn wait_for_samples(&self) {
        self.added.notified().await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sample>> {
        self.samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
