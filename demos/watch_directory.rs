//! Watches every file in a directory and reports the ones that get burned.
//!
//! This example shows how to:
//! - Hash a directory into samples
//! - Register a real provider (or the mock one)
//! - React to burned samples and shut down cleanly
//!
//! Run with:
//!   VT_API_KEY=... cargo run --example watch_directory --features virustotal -- <dir>
//!   cargo run --example watch_directory -- <dir> --mock

use snitch::prelude::*;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,snitch=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let dir = args.next().ok_or("usage: watch_directory <dir> [--mock]")?;
    let use_mock = args.any(|arg| arg == "--mock");

    let samples = hash_directory(&dir)?;
    println!("=== Watching {} samples from {dir} ===\n", samples.len());
    for sample in &samples {
        println!("  {sample}");
    }

    let provider = build_provider(use_mock, &samples)?;
    println!(
        "\nProvider: {} ({} lookups every {:?})\n",
        provider.name(),
        provider.max_requests(),
        provider.threshold()
    );

    let snitch = Snitch::builder()
        .register_arc(provider)
        .on_flagged(|result| {
            println!(
                "BURNED: {} seen by {} at {}",
                result.sample(),
                result.provider(),
                result.last_seen()
            );
        })
        .build()?;

    snitch.start()?;
    for sample in samples {
        snitch.add_sample(sample).await?;
    }

    println!("Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;

    snitch.stop().await;
    println!("\n{} sample(s) burned.", snitch.flagged_count());
    Ok(())
}

fn build_provider(
    use_mock: bool,
    samples: &[Sample],
) -> Result<ArcProvider, Box<dyn std::error::Error>> {
    if use_mock {
        // Pretend the first file is already known upstream.
        let mut mock = MockProvider::new()
            .with_max_requests(2)
            .with_threshold(Duration::from_secs(3));
        if let Some(first) = samples.first() {
            mock = mock.with_response(first.hash(), MockResponse::flagged_now());
        }
        return Ok(std::sync::Arc::new(mock));
    }

    remote_provider()
}

#[cfg(feature = "virustotal")]
fn remote_provider() -> Result<ArcProvider, Box<dyn std::error::Error>> {
    use snitch::providers::{VirusTotalConfig, VirusTotalProvider};
    let provider = VirusTotalProvider::new(VirusTotalConfig::from_env()?)?;
    Ok(std::sync::Arc::new(provider))
}

#[cfg(not(feature = "virustotal"))]
fn remote_provider() -> Result<ArcProvider, Box<dyn std::error::Error>> {
    Err("built without the `virustotal` feature; pass --mock".into())
}
