//! The `Snitch` coordinator.

use crate::core::{ArcProvider, Provider, Sample, ScanResult, SnitchError, SnitchResult};
use crate::scheduler::config::SnitchConfig;
use crate::scheduler::scan_loop::{ResultHandler, ScanLoop};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Consumer callback invoked once per burned sample.
pub type FlaggedCallback = Arc<dyn Fn(ScanResult) + Send + Sync>;

type Registry = HashMap<String, ArcProvider>;

/// Hashes that have already been reported.
#[derive(Debug, Default)]
struct FlaggedSet {
    hashes: Mutex<HashSet<String>>,
}

impl FlaggedSet {
    /// Records `hash`; returns `false` if it was already recorded.
    fn claim(&self, hash: &str) -> bool {
        self.lock().insert(hash.to_string())
    }

    fn contains(&self, hash: &str) -> bool {
        self.lock().contains(hash)
    }

    fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.hashes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Turns positive results from any provider into at most one callback per
/// hash.
///
/// The hash is claimed and removed from every provider before the
/// callback runs, so a second provider can neither re-report it nor keep
/// scanning it.
struct FlagDispatcher {
    registry: Arc<Registry>,
    flagged: Arc<FlaggedSet>,
    on_flagged: Option<FlaggedCallback>,
}

impl FlagDispatcher {
    fn handle(&self, result: ScanResult) {
        if !self.flagged.claim(result.hash()) {
            tracing::debug!(
                provider = result.provider(),
                hash = result.hash(),
                "Sample already reported, dropping duplicate detection"
            );
            return;
        }

        for provider in self.registry.values() {
            provider.remove(result.sample());
        }

        tracing::info!(
            provider = result.provider(),
            sample = result.sample().name(),
            hash = result.hash(),
            last_seen = %result.last_seen(),
            "Sample burned"
        );

        if let Some(on_flagged) = &self.on_flagged {
            on_flagged(result);
        }
    }
}

enum Lifecycle {
    Idle,
    Running(Running),
    Stopped,
}

struct Running {
    sender: mpsc::Sender<Sample>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Builder for creating a `Snitch`.
pub struct SnitchBuilder {
    providers: Vec<ArcProvider>,
    on_flagged: Option<FlaggedCallback>,
    config: SnitchConfig,
}

impl SnitchBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            on_flagged: None,
            config: SnitchConfig::default(),
        }
    }

    /// Adds a provider.
    pub fn register<P: Provider + 'static>(mut self, provider: P) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Adds a provider wrapped in an Arc.
    pub fn register_arc(mut self, provider: ArcProvider) -> Self {
        self.providers.push(provider);
        self
    }

    /// Sets the callback invoked for every burned sample.
    pub fn on_flagged<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScanResult) + Send + Sync + 'static,
    {
        self.on_flagged = Some(Arc::new(callback));
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: SnitchConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the coordinator.
    pub fn build(self) -> SnitchResult<Snitch> {
        if self.providers.is_empty() {
            return Err(SnitchError::NoProviders);
        }

        let snitch = Snitch {
            registry: Mutex::new(Registry::new()),
            flagged: Arc::new(FlaggedSet::default()),
            on_flagged: self.on_flagged,
            config: self.config,
            lifecycle: Mutex::new(Lifecycle::Idle),
        };
        for provider in self.providers {
            snitch.register_arc(provider);
        }
        Ok(snitch)
    }
}

impl Default for SnitchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Watches samples across every registered provider.
///
/// Lifecycle: register providers, [`start`](Snitch::start), feed samples
/// with [`add`](Snitch::add), and finally [`stop`](Snitch::stop).
/// Each provider gets its own scan loop; the first provider to flag a
/// sample wins, the sample is withdrawn from all of them, and the
/// callback fires once. The callback may run concurrently for different
/// samples.
///
/// # Panics
///
/// Registering a provider after `start`, calling `stop` before `start`,
/// or calling `stop` twice are programming errors and panic.
///
/// # Example
///
/// ```rust,no_run
/// use snitch::providers::MockProvider;
/// use snitch::Snitch;
///
/// # async fn run() -> Result<(), snitch::SnitchError> {
/// let snitch = Snitch::builder()
///     .register(MockProvider::new())
///     .on_flagged(|result| println!("{} burned", result.sample()))
///     .build()?;
///
/// snitch.start()?;
/// snitch.add("implant.exe", "44d88612fea8a8f36de82e1278abb02f").await?;
/// snitch.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Snitch {
    registry: Mutex<Registry>,
    flagged: Arc<FlaggedSet>,
    on_flagged: Option<FlaggedCallback>,
    config: SnitchConfig,
    lifecycle: Mutex<Lifecycle>,
}

impl Snitch {
    /// Creates a coordinator with no providers and the given callback.
    pub fn new<F>(on_flagged: F) -> Self
    where
        F: Fn(ScanResult) + Send + Sync + 'static,
    {
        Self::with_config(on_flagged, SnitchConfig::default())
    }

    /// Creates a coordinator with a custom configuration.
    pub fn with_config<F>(on_flagged: F, config: SnitchConfig) -> Self
    where
        F: Fn(ScanResult) + Send + Sync + 'static,
    {
        Self {
            registry: Mutex::new(Registry::new()),
            flagged: Arc::new(FlaggedSet::default()),
            on_flagged: Some(Arc::new(on_flagged)),
            config,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Creates a new builder.
    pub fn builder() -> SnitchBuilder {
        SnitchBuilder::new()
    }

    /// Registers a provider under its name.
    ///
    /// A provider registered under an existing name replaces the old one.
    ///
    /// # Panics
    ///
    /// Panics if the coordinator has already been started.
    pub fn register<P: Provider + 'static>(&self, provider: P) {
        self.register_arc(Arc::new(provider));
    }

    /// Registers a provider wrapped in an Arc.
    ///
    /// # Panics
    ///
    /// Panics if the coordinator has already been started.
    pub fn register_arc(&self, provider: ArcProvider) {
        assert!(
            matches!(*self.lifecycle(), Lifecycle::Idle),
            "providers must be registered before Snitch::start"
        );

        let name = provider.name().to_string();
        if self.registry().insert(name.clone(), provider).is_some() {
            tracing::debug!(provider = %name, "Replacing provider registered under the same name");
        }
    }

    /// Spawns one scan loop per provider plus the ingestion task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// * `NoProviders` - Nothing has been registered.
    /// * `AlreadyStarted` - The coordinator was started before.
    pub fn start(&self) -> SnitchResult<()> {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(SnitchError::AlreadyStarted);
        }

        let registry = Arc::new(self.registry().clone());
        if registry.is_empty() {
            return Err(SnitchError::NoProviders);
        }

        let shutdown = CancellationToken::new();
        let dispatcher = Arc::new(FlagDispatcher {
            registry: Arc::clone(&registry),
            flagged: Arc::clone(&self.flagged),
            on_flagged: self.on_flagged.clone(),
        });
        let handler: ResultHandler = Arc::new(move |result: ScanResult| dispatcher.handle(result));

        let mut tasks = Vec::with_capacity(registry.len() + 1);
        for provider in registry.values() {
            let scan_loop = ScanLoop::new(
                Arc::clone(provider),
                Arc::clone(&handler),
                shutdown.child_token(),
            )
            .with_config(self.config.scan_loop.clone());
            tasks.push(scan_loop.spawn());
        }

        let (sender, receiver) = mpsc::channel(self.config.ingest_capacity.max(1));
        tasks.push(tokio::spawn(fan_out(
            receiver,
            Arc::clone(&registry),
            Arc::clone(&self.flagged),
            shutdown.child_token(),
        )));

        tracing::info!(
            providers = ?registry.keys().collect::<Vec<_>>(),
            ingest_capacity = self.config.ingest_capacity,
            "Snitch started"
        );

        *lifecycle = Lifecycle::Running(Running {
            sender,
            shutdown,
            tasks,
        });
        Ok(())
    }

    /// Cancels every scan loop and the ingestion task, then waits for them.
    ///
    /// Sleeping loops wake immediately; a query in flight is abandoned.
    /// Callbacks already dispatched finish before this returns.
    ///
    /// # Panics
    ///
    /// Panics if called before `start` or more than once.
    pub async fn stop(&self) {
        let running = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(running) => running,
                Lifecycle::Idle => panic!("Snitch::stop called before Snitch::start"),
                Lifecycle::Stopped => panic!("Snitch::stop called more than once"),
            }
        };

        running.shutdown.cancel();
        drop(running.sender);

        for joined in futures::future::join_all(running.tasks).await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "Snitch task ended abnormally");
            }
        }

        tracing::info!(flagged = self.flagged.len(), "Snitch stopped");
    }

    /// Queues a sample for every provider.
    ///
    /// Waits only while the ingestion buffer is full.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` before `start` or after `stop`.
    pub async fn add(&self, name: impl Into<String>, hash: impl Into<String>) -> SnitchResult<()> {
        self.add_sample(Sample::new(name, hash)).await
    }

    /// Queues an already built sample for every provider.
    pub async fn add_sample(&self, sample: Sample) -> SnitchResult<()> {
        let sender = self.sender().ok_or(SnitchError::NotRunning)?;
        sender
            .send(sample)
            .await
            .map_err(|_| SnitchError::NotRunning)
    }

    /// Returns `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle(), Lifecycle::Running(_))
    }

    /// Returns `true` if the hash has been reported.
    pub fn is_flagged(&self, hash: &str) -> bool {
        self.flagged.contains(hash)
    }

    /// Returns the number of samples reported so far.
    pub fn flagged_count(&self) -> usize {
        self.flagged.len()
    }

    /// Returns the number of registered providers.
    pub fn provider_count(&self) -> usize {
        self.registry().len()
    }

    /// Looks up a registered provider by name.
    pub fn provider(&self, name: &str) -> Option<ArcProvider> {
        self.registry().get(name).cloned()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &SnitchConfig {
        &self.config
    }

    fn sender(&self) -> Option<mpsc::Sender<Sample>> {
        match &*self.lifecycle() {
            Lifecycle::Running(running) => Some(running.sender.clone()),
            _ => None,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Snitch {
    fn drop(&mut self) {
        if let Lifecycle::Running(running) = &*self.lifecycle() {
            running.shutdown.cancel();
        }
    }
}

impl std::fmt::Debug for Snitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snitch")
            .field("provider_count", &self.provider_count())
            .field("flagged_count", &self.flagged_count())
            .field("running", &self.is_running())
            .field("config", &self.config)
            .finish()
    }
}

/// Hands every ingested sample to every provider.
async fn fan_out(
    mut receiver: mpsc::Receiver<Sample>,
    registry: Arc<Registry>,
    flagged: Arc<FlaggedSet>,
    shutdown: CancellationToken,
) {
    loop {
        let sample = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = receiver.recv() => match received {
                Some(sample) => sample,
                None => break,
            },
        };

        if flagged.contains(sample.hash()) {
            tracing::debug!(hash = sample.hash(), "Ignoring sample that was already reported");
            continue;
        }

        tracing::debug!(sample = sample.name(), hash = sample.hash(), "Watching sample");
        for provider in registry.values() {
            provider.add(sample.clone());
        }

        // The dispatcher claims before it removes. A claim that landed while
        // we were adding may have missed some of the adds, so undo them here.
        if flagged.contains(sample.hash()) {
            tracing::debug!(
                hash = sample.hash(),
                "Sample reported during fan-out, withdrawing it"
            );
            for provider in registry.values() {
                provider.remove(&sample);
            }
        }
    }

    tracing::debug!("Ingestion stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PendingList, ScanError};
    use crate::providers::{MockProvider, MockResponse};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::time::Duration;

    fn recorder() -> (
        impl Fn(ScanResult) + Send + Sync + 'static,
        Arc<Mutex<Vec<ScanResult>>>,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (move |result: ScanResult| sink.lock().unwrap().push(result), seen)
    }

    fn quiet(name: &str) -> MockProvider {
        MockProvider::new()
            .with_name(name)
            .with_threshold(Duration::from_secs(1))
    }

    /// A provider whose `add` blocks, widening the fan-out window.
    #[derive(Debug)]
    struct SlowIntake {
        inner: MockProvider,
        delay: Duration,
    }

    #[async_trait]
    impl Provider for SlowIntake {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn pending(&self) -> &PendingList {
            self.inner.pending()
        }

        fn threshold(&self) -> Duration {
            self.inner.threshold()
        }

        fn max_requests(&self) -> usize {
            self.inner.max_requests()
        }

        fn add(&self, sample: Sample) {
            std::thread::sleep(self.delay);
            self.inner.pending().push(sample);
        }

        async fn scan(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError> {
            self.inner.scan(sample).await
        }
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn test_dispatcher_reports_each_hash_once() {
        let a: ArcProvider = Arc::new(quiet("a"));
        let b: ArcProvider = Arc::new(quiet("b"));
        for provider in [&a, &b] {
            provider.add(Sample::new("implant", "bad"));
            provider.add(Sample::new("other", "fine"));
        }

        let registry: Registry = [a.clone(), b.clone()]
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        let (callback, seen) = recorder();
        let dispatcher = FlagDispatcher {
            registry: Arc::new(registry),
            flagged: Arc::new(FlaggedSet::default()),
            on_flagged: Some(Arc::new(callback)),
        };

        let sample = Sample::new("implant", "bad");
        dispatcher.handle(ScanResult::new(sample.clone(), "a", Utc::now()));
        dispatcher.handle(ScanResult::new(sample, "b", Utc::now()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].provider(), "a");

        // Withdrawn from the provider that never flagged it too
        assert_eq!(a.samples(), vec![Sample::new("other", "fine")]);
        assert_eq!(b.samples(), vec![Sample::new("other", "fine")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_sample_flagged_by_two_providers_reported_once() {
        let (callback, seen) = recorder();
        let snitch = Snitch::new(callback);
        snitch.register(quiet("vt").with_response("bad", MockResponse::flagged_now()));
        snitch.register(quiet("xforce").with_response("bad", MockResponse::flagged_now()));

        snitch.start().unwrap();
        snitch.add("implant.exe", "bad").await.unwrap();
        snitch.add("clean.exe", "fine").await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(snitch.is_flagged("bad"));
        assert_eq!(snitch.flagged_count(), 1);
        for name in ["vt", "xforce"] {
            let samples = snitch.provider(name).unwrap().samples();
            assert_eq!(samples, vec![Sample::new("clean.exe", "fine")]);
        }

        snitch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_flag_withdraws_sample_from_slow_provider() {
        let fast = Arc::new(quiet("fast").with_response("bad", MockResponse::flagged_now()));
        let slow = Arc::new(
            quiet("slow")
                .with_max_requests(1)
                .with_threshold(Duration::from_secs(3600))
                .with_response("bad", MockResponse::flagged_now()),
        );

        let (callback, seen) = recorder();
        let snitch = Snitch::builder()
            .register_arc(fast.clone())
            .register_arc(slow.clone())
            .on_flagged(callback)
            .build()
            .unwrap();

        snitch.start().unwrap();
        snitch.add("filler.exe", "filler").await.unwrap();
        snitch.add("implant.exe", "bad").await.unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].provider(), "fast");
        assert!(!slow.pending().contains("bad"));
        assert_eq!(slow.scans_of("bad"), 0);

        snitch.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_flag_during_fan_out_withdraws_late_add() {
        // Registry order is random; repeat so the fast provider goes first
        // in at least some runs.
        for _ in 0..4 {
            let fast = Arc::new(
                quiet("fast")
                    .with_threshold(Duration::from_millis(10))
                    .with_response("bad", MockResponse::flagged_now()),
            );
            let slow = Arc::new(SlowIntake {
                inner: quiet("slow").with_threshold(Duration::from_millis(10)),
                delay: Duration::from_millis(200),
            });

            let (callback, seen) = recorder();
            let snitch = Snitch::builder()
                .register_arc(fast.clone())
                .register_arc(slow.clone())
                .on_flagged(callback)
                .build()
                .unwrap();

            snitch.start().unwrap();
            snitch.add("implant.exe", "bad").await.unwrap();

            wait_until(|| snitch.is_flagged("bad")).await;
            tokio::time::sleep(Duration::from_millis(400)).await;
            snitch.stop().await;

            assert_eq!(seen.lock().unwrap().len(), 1);
            assert!(!fast.pending().contains("bad"));
            assert!(!slow.pending().contains("bad"));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_reports_each_hash_once() {
        let providers: Vec<Arc<MockProvider>> = ["vt", "xforce", "otx"]
            .into_iter()
            .map(|name| {
                Arc::new(
                    quiet(name)
                        .with_max_requests(3)
                        .with_threshold(Duration::from_millis(10))
                        .with_default_response(MockResponse::flagged_now()),
                )
            })
            .collect();

        let (callback, seen) = recorder();
        let mut builder = Snitch::builder().on_flagged(callback);
        for provider in &providers {
            builder = builder.register_arc(provider.clone());
        }
        let snitch = Arc::new(builder.build().unwrap());
        snitch.start().unwrap();

        // Every feeder sends every hash, so duplicates race each other.
        let feeders: Vec<_> = (0..4)
            .map(|feeder| {
                let snitch = Arc::clone(&snitch);
                tokio::spawn(async move {
                    for i in 0..50 {
                        let hash = format!("hash-{i:02}");
                        snitch.add(format!("copy-{feeder}"), hash).await.unwrap();
                    }
                })
            })
            .collect();
        for feeder in feeders {
            feeder.await.unwrap();
        }

        wait_until(|| snitch.flagged_count() == 50).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        snitch.stop().await;

        let seen = seen.lock().unwrap();
        let unique: HashSet<&str> = seen.iter().map(|r| r.hash()).collect();
        assert_eq!(seen.len(), 50);
        assert_eq!(unique.len(), 50);
        for provider in &providers {
            assert!(provider.samples().is_empty(), "{} still pending", provider.name());
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_callback() {
        let (sink, seen) = recorder();
        let snitch = Snitch::new(move |result| {
            std::thread::sleep(Duration::from_millis(200));
            sink(result);
        });
        snitch.register(
            quiet("vt")
                .with_threshold(Duration::from_millis(10))
                .with_response("bad", MockResponse::flagged_now()),
        );

        snitch.start().unwrap();
        snitch.add("implant.exe", "bad").await.unwrap();
        wait_until(|| snitch.is_flagged("bad")).await;
        snitch.stop().await;

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_ingest_capacity_is_usable() {
        let snitch = Snitch::with_config(|_| {}, SnitchConfig::new().with_ingest_capacity(0));
        snitch.register(quiet("vt"));

        snitch.start().unwrap();
        snitch.add("a", "a").await.unwrap();
        snitch.add("b", "b").await.unwrap();
        snitch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_detection_and_reingest() {
        let provider = Arc::new(quiet("vt"));
        let (callback, seen) = recorder();
        let snitch = Snitch::new(callback);
        snitch.register_arc(provider.clone());
        snitch.start().unwrap();

        snitch.add("implant.exe", "bad").await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(seen.lock().unwrap().is_empty());
        assert!(provider.scans_of("bad") > 1);

        provider.set_response("bad", MockResponse::flagged_now());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);

        // Feeding the burned hash again does not queue it
        snitch.add("implant-copy.exe", "bad").await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(provider.samples().is_empty());
        assert_eq!(seen.lock().unwrap().len(), 1);

        snitch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_wakes_sleeping_loops() {
        let provider = Arc::new(
            quiet("vt")
                .with_max_requests(1)
                .with_threshold(Duration::from_secs(3600)),
        );
        let snitch = Snitch::new(|_| {});
        snitch.register_arc(provider.clone());
        snitch.start().unwrap();
        snitch.add("a", "a").await.unwrap();
        snitch.add("b", "b").await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let start = tokio::time::Instant::now();
        snitch.stop().await;

        assert!(start.elapsed() < Duration::from_secs(3600));
        assert!(!snitch.is_running());
        assert_eq!(provider.scan_count(), 1);
    }

    #[tokio::test]
    async fn test_add_requires_running() {
        let snitch = Snitch::new(|_| {});
        snitch.register(quiet("vt"));

        assert!(matches!(
            snitch.add("a", "a").await,
            Err(SnitchError::NotRunning)
        ));

        snitch.start().unwrap();
        snitch.add("a", "a").await.unwrap();
        snitch.stop().await;

        assert!(matches!(
            snitch.add("a", "a").await,
            Err(SnitchError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_start_errors() {
        let empty = Snitch::new(|_| {});
        assert!(matches!(empty.start(), Err(SnitchError::NoProviders)));

        let snitch = Snitch::new(|_| {});
        snitch.register(quiet("vt"));
        snitch.start().unwrap();
        assert!(matches!(snitch.start(), Err(SnitchError::AlreadyStarted)));
        snitch.stop().await;
    }

    #[test]
    fn test_builder_requires_provider() {
        let result = Snitch::builder().build();
        assert!(matches!(result, Err(SnitchError::NoProviders)));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let snitch = Snitch::new(|_| {});
        snitch.register(quiet("vt").with_max_requests(4));
        snitch.register(quiet("vt").with_max_requests(2));

        assert_eq!(snitch.provider_count(), 1);
        assert_eq!(snitch.provider("vt").unwrap().max_requests(), 2);
    }

    #[tokio::test]
    #[should_panic(expected = "more than once")]
    async fn test_double_stop_panics() {
        let snitch = Snitch::new(|_| {});
        snitch.register(quiet("vt"));
        snitch.start().unwrap();
        snitch.stop().await;
        snitch.stop().await;
    }

    #[tokio::test]
    #[should_panic(expected = "before Snitch::start")]
    async fn test_stop_before_start_panics() {
        let snitch = Snitch::new(|_| {});
        snitch.stop().await;
    }

    #[tokio::test]
    #[should_panic(expected = "registered before")]
    async fn test_register_after_start_panics() {
        let snitch = Snitch::new(|_| {});
        snitch.register(quiet("vt"));
        snitch.start().unwrap();
        snitch.register(quiet("xforce"));
    }
}
