//! The per-provider batch scan loop.

use crate::core::{ArcProvider, Sample, ScanError, ScanResult};
use crate::scheduler::config::ScanLoopConfig;
use crate::scheduler::pacing::{batches, cool_down};

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

/// Receives every positive result a scan loop produces.
///
/// Each call runs on its own task, so a slow handler never stalls the loop.
/// The loop waits for those tasks before [`ScanLoop::run`] returns.
pub type ResultHandler = Arc<dyn Fn(ScanResult) + Send + Sync>;

/// Counters for one pass over a provider's pending list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    /// Batches started.
    pub chunks: usize,
    /// Queries issued.
    pub scanned: usize,
    /// Queries that came back positive.
    pub flagged: usize,
    /// Queries that failed and will be retried next round.
    pub failed: usize,
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The pending list was empty; nothing was scanned.
    Idle,
    /// Every batch was scanned and followed by its cool-down.
    Completed(RoundStats),
    /// Shutdown was requested before the round finished.
    Cancelled,
}

/// Drains one provider's pending list in rate-limited batches.
///
/// Each round snapshots the pending list, scans it batch by batch with the
/// samples of a batch queried one after the other, and sleeps the
/// provider's threshold after every batch. Positive samples are dropped
/// from the provider and handed to the [`ResultHandler`]; failed ones stay
/// pending for the next round.
pub struct ScanLoop {
    provider: ArcProvider,
    handler: ResultHandler,
    shutdown: CancellationToken,
    config: ScanLoopConfig,
    dispatched: Mutex<JoinSet<()>>,
}

impl ScanLoop {
    /// Creates a loop for `provider` that stops when `shutdown` is cancelled.
    pub fn new(provider: ArcProvider, handler: ResultHandler, shutdown: CancellationToken) -> Self {
        Self {
            provider,
            handler,
            shutdown,
            config: ScanLoopConfig::default(),
            dispatched: Mutex::new(JoinSet::new()),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ScanLoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the loop on a new tokio task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs rounds until shutdown is requested.
    ///
    /// With nothing pending the loop parks until the provider receives a
    /// sample. Handlers already dispatched run to completion before this
    /// returns.
    pub async fn run(self) {
        tracing::info!(
            provider = self.provider.name(),
            threshold_secs = self.provider.threshold().as_secs_f64(),
            max_requests = self.provider.max_requests(),
            "Scan loop starting"
        );

        loop {
            match self.run_round().await {
                RoundOutcome::Cancelled => break,
                RoundOutcome::Idle => {
                    tokio::select! {
                        _ = self.shutdown.cancelled() => break,
                        _ = self.provider.pending().wait_for_samples() => {}
                    }
                }
                RoundOutcome::Completed(stats) => {
                    tracing::debug!(
                        provider = self.provider.name(),
                        chunks = stats.chunks,
                        scanned = stats.scanned,
                        flagged = stats.flagged,
                        failed = stats.failed,
                        "Scan round completed"
                    );
                }
            }
        }

        self.drain_dispatched().await;
        tracing::info!(provider = self.provider.name(), "Scan loop stopped");
    }

    /// Runs a single pass over the current pending list.
    pub async fn run_round(&self) -> RoundOutcome {
        if self.shutdown.is_cancelled() {
            return RoundOutcome::Cancelled;
        }

        let snapshot = self.provider.samples();
        if snapshot.is_empty() {
            return RoundOutcome::Idle;
        }

        let mut stats = RoundStats::default();
        for chunk in batches(&snapshot, self.provider.max_requests()) {
            stats.chunks += 1;

            for sample in chunk {
                let verdict = tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => return RoundOutcome::Cancelled,
                    verdict = self.scan_with_timeout(sample) => verdict,
                };
                stats.scanned += 1;

                match verdict {
                    Ok(Some(result)) => {
                        stats.flagged += 1;
                        tracing::debug!(
                            provider = self.provider.name(),
                            sample = sample.name(),
                            hash = sample.hash(),
                            "Sample flagged"
                        );
                        self.provider.remove(sample);
                        self.dispatch(result);
                    }
                    Ok(None) => {
                        tracing::trace!(
                            provider = self.provider.name(),
                            hash = sample.hash(),
                            "Sample not known yet"
                        );
                    }
                    Err(e) => {
                        stats.failed += 1;
                        tracing::warn!(
                            provider = self.provider.name(),
                            hash = sample.hash(),
                            error = %e,
                            recoverable = e.is_recoverable(),
                            "Scan failed, keeping sample for next round"
                        );
                    }
                }
            }

            if !cool_down(&self.shutdown, self.provider.threshold()).await {
                return RoundOutcome::Cancelled;
            }
        }

        RoundOutcome::Completed(stats)
    }

    async fn scan_with_timeout(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError> {
        match self.config.scan_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.provider.scan(sample)).await {
                Ok(verdict) => verdict,
                Err(_) => Err(ScanError::timeout(self.provider.name(), limit)),
            },
            None => self.provider.scan(sample).await,
        }
    }

    fn dispatch(&self, result: ScanResult) {
        let handler = Arc::clone(&self.handler);
        let mut dispatched = self.dispatched();
        while dispatched.try_join_next().is_some() {}
        dispatched.spawn(async move { handler(result) });
    }

    async fn drain_dispatched(&self) {
        let mut pending = std::mem::take(&mut *self.dispatched());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(provider = self.provider.name(), error = %e, "Result handler failed");
            }
        }
    }

    fn dispatched(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.dispatched
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ScanLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanLoop")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Provider;
    use crate::providers::{MockProvider, MockResponse};
    use std::time::Duration;

    fn collector() -> (ResultHandler, Arc<Mutex<Vec<ScanResult>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: ResultHandler =
            Arc::new(move |result: ScanResult| sink.lock().unwrap().push(result));
        (handler, seen)
    }

    fn hash_of(i: usize) -> String {
        format!("hash-{i:02}")
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_batches_and_flags_one_sample() {
        let provider = Arc::new(
            MockProvider::new()
                .with_max_requests(4)
                .with_threshold(Duration::from_secs(120))
                .with_response(hash_of(7), MockResponse::flagged_now()),
        );
        for i in 1..=10 {
            provider.add(Sample::new(format!("sample-{i}"), hash_of(i)));
        }

        let (handler, seen) = collector();
        let scan_loop = ScanLoop::new(provider.clone(), handler, CancellationToken::new());

        let start = tokio::time::Instant::now();
        let outcome = scan_loop.run_round().await;
        tokio::task::yield_now().await;

        assert_eq!(
            outcome,
            RoundOutcome::Completed(RoundStats {
                chunks: 3,
                scanned: 10,
                flagged: 1,
                failed: 0,
            })
        );
        // One cool-down per batch
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3 * 120));
        assert!(elapsed < Duration::from_secs(4 * 120));

        let pending = provider.samples();
        assert_eq!(pending.len(), 9);
        assert!(pending.iter().all(|s| s.hash() != hash_of(7)));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].hash(), hash_of(7));
        assert_eq!(seen[0].sample().name(), "sample-7");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_sample_is_retried_next_round() {
        let provider = Arc::new(
            MockProvider::new()
                .with_max_requests(3)
                .with_response("flaky", MockResponse::Fail),
        );
        provider.add(Sample::new("a", "a"));
        provider.add(Sample::new("flaky", "flaky"));
        provider.add(Sample::new("c", "c"));

        let (handler, seen) = collector();
        let scan_loop = ScanLoop::new(provider.clone(), handler, CancellationToken::new());

        let first = scan_loop.run_round().await;
        assert!(matches!(first, RoundOutcome::Completed(stats) if stats.failed == 1 && stats.scanned == 3));
        assert!(provider.pending().contains("flaky"));
        assert_eq!(provider.scans_of("a"), 1);
        assert_eq!(provider.scans_of("c"), 1);

        scan_loop.run_round().await;
        assert_eq!(provider.scans_of("flaky"), 2);
        assert_eq!(provider.scans_of("c"), 2);
        assert_eq!(provider.samples().len(), 3);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_scan_times_out() {
        let provider = Arc::new(MockProvider::new().with_latency(Duration::from_secs(600)));
        provider.add(Sample::new("slow", "slow"));

        let (handler, _seen) = collector();
        let scan_loop = ScanLoop::new(provider.clone(), handler, CancellationToken::new())
            .with_config(ScanLoopConfig::new().with_scan_timeout(Duration::from_secs(5)));

        let outcome = scan_loop.run_round().await;
        assert!(matches!(outcome, RoundOutcome::Completed(stats) if stats.failed == 1));
        assert!(provider.pending().contains("slow"));
    }

    #[tokio::test]
    async fn test_empty_list_is_idle() {
        let provider = Arc::new(MockProvider::new());
        let (handler, _seen) = collector();
        let scan_loop = ScanLoop::new(provider, handler, CancellationToken::new());

        assert_eq!(scan_loop.run_round().await, RoundOutcome::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_cool_down() {
        let provider = Arc::new(
            MockProvider::new()
                .with_max_requests(1)
                .with_threshold(Duration::from_secs(3600)),
        );
        provider.add(Sample::new("a", "a"));
        provider.add(Sample::new("b", "b"));

        let (handler, _seen) = collector();
        let shutdown = CancellationToken::new();
        let start = tokio::time::Instant::now();
        let task = ScanLoop::new(provider.clone(), handler, shutdown.clone()).spawn();

        // Let the loop scan the first batch and start its cool-down
        tokio::time::sleep(Duration::from_secs(1)).await;
        shutdown.cancel();
        task.await.unwrap();

        assert!(start.elapsed() < Duration::from_secs(3600));
        assert_eq!(provider.scans_of("a"), 1);
        assert_eq!(provider.scans_of("b"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_loop_wakes_on_add() {
        let provider = Arc::new(
            MockProvider::new().with_response("late", MockResponse::flagged_now()),
        );
        let (handler, seen) = collector();
        let shutdown = CancellationToken::new();
        let task = ScanLoop::new(provider.clone(), handler, shutdown.clone()).spawn();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(provider.scan_count(), 0);

        provider.add(Sample::new("late", "late"));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_waits_for_dispatched_handlers() {
        let provider = Arc::new(
            MockProvider::new()
                .with_threshold(Duration::from_millis(10))
                .with_response("bad", MockResponse::flagged_now()),
        );
        provider.add(Sample::new("implant", "bad"));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: ResultHandler = Arc::new(move |result: ScanResult| {
            std::thread::sleep(Duration::from_millis(200));
            sink.lock().unwrap().push(result);
        });

        let shutdown = CancellationToken::new();
        let task = ScanLoop::new(provider.clone(), handler, shutdown.clone()).spawn();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while provider.pending().contains("bad") && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_round() {
        let provider = Arc::new(MockProvider::new());
        provider.add(Sample::new("a", "a"));

        let (handler, _seen) = collector();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let scan_loop = ScanLoop::new(provider.clone(), handler, shutdown);
        assert_eq!(scan_loop.run_round().await, RoundOutcome::Cancelled);
        assert_eq!(provider.scan_count(), 0);
    }
}
