//! Custom provider example demonstrating how to plug in a new intel source.
//!
//! This example shows how to:
//! - Implement the Provider trait on top of an in-memory blocklist
//! - Run it next to another provider
//! - Observe that a burned sample is reported once and withdrawn everywhere
//!
//! Run with: cargo run --example custom_provider

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snitch::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Flags hashes found in a local blocklist, e.g. an exported IOC feed.
#[derive(Debug)]
struct BlocklistProvider {
    name: String,
    pending: PendingList,
    blocklist: HashMap<String, DateTime<Utc>>,
}

impl BlocklistProvider {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pending: PendingList::new(),
            blocklist: HashMap::new(),
        }
    }

    fn with_blocked_hash(mut self, hash: impl Into<String>, first_seen: DateTime<Utc>) -> Self {
        self.blocklist.insert(hash.into(), first_seen);
        self
    }
}

#[async_trait]
impl Provider for BlocklistProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn pending(&self) -> &PendingList {
        &self.pending
    }

    fn threshold(&self) -> Duration {
        Duration::from_millis(500)
    }

    fn max_requests(&self) -> usize {
        10
    }

    async fn scan(&self, sample: &Sample) -> Result<Option<ScanResult>, ScanError> {
        tracing::debug!(provider = self.name(), sample = %sample, "Checking blocklist");

        Ok(self
            .blocklist
            .get(sample.hash())
            .map(|first_seen| ScanResult::new(sample.clone(), self.name(), *first_seen)))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Custom Provider Example ===\n");

    let hasher = SampleHasher::new();
    let burned_hash = hasher.hash_bytes(b"This implant was uploaded to a sandbox.");
    let clean_hash = hasher.hash_bytes(b"This implant never left the lab.");

    let blocklist = BlocklistProvider::new("ioc-feed").with_blocked_hash(&burned_hash, Utc::now());
    let mock = Arc::new(MockProvider::new().with_name("slow-intel"));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let snitch = Snitch::builder()
        .register(blocklist)
        .register_arc(mock.clone())
        .on_flagged(move |result| {
            let _ = tx.send(result);
        })
        .build()?;

    snitch.start()?;
    snitch.add("burned.exe", &burned_hash).await?;
    snitch.add("fresh.exe", &clean_hash).await?;

    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(result)) => println!(
            "\nBURNED: {} (reported by {}, first seen {})",
            result.sample(),
            result.provider(),
            result.last_seen()
        ),
        _ => println!("\nNothing burned within 5s (unexpected!)"),
    }

    // Give the loops a moment, then show what each provider still watches.
    tokio::time::sleep(Duration::from_secs(1)).await;
    for name in ["ioc-feed", "slow-intel"] {
        if let Some(provider) = snitch.provider(name) {
            let pending: Vec<String> = provider.samples().iter().map(|s| s.to_string()).collect();
            println!("{name} still watching: {pending:?}");
        }
    }

    snitch.stop().await;
    println!("\nslow-intel performed {} lookups", mock.scan_count());
    println!("\n=== Example Complete ===");
    Ok(())
}
