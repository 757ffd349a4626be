//! Batching and rate-limit pacing for provider scan loops.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Splits a snapshot into consecutive batches of at most `max_requests`.
///
/// The last batch may be shorter. A `max_requests` of 0 is treated as 1 so
/// a misconfigured provider still makes progress.
pub fn batches<T>(items: &[T], max_requests: usize) -> std::slice::Chunks<'_, T> {
    items.chunks(max_requests.max(1))
}

/// Number of batches [`batches`] yields for `len` items.
pub fn batch_count(len: usize, max_requests: usize) -> usize {
    len.div_ceil(max_requests.max(1))
}

/// Sleeps for a provider's cool-down unless shutdown is requested first.
///
/// Returns `false` if the sleep was cut short by cancellation.
pub async fn cool_down(shutdown: &CancellationToken, threshold: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(threshold) => true,
    }
}
