//! # Snitch
//!
//! Know when your samples are burned.
//!
//! ## Overview
//!
//! Snitch watches content hashes against public threat-intel providers and
//! tells you, exactly once per sample, when one of them has seen it:
//!
//! - Register any number of providers behind one [`Provider`] trait
//! - Each provider is polled on its own task, in batches of `max_requests`
//!   lookups followed by a `threshold` cool-down
//! - The first detection removes the sample from every provider and fires
//!   your callback
//! - Failed lookups are logged and retried on the next round
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use snitch::providers::{MockProvider, MockResponse};
//! use snitch::Snitch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let snitch = Snitch::builder()
//!         .register(MockProvider::new().with_default_response(MockResponse::flagged_now()))
//!         .on_flagged(|result| println!("burned: {}", result.sample()))
//!         .build()?;
//!
//!     snitch.start()?;
//!     snitch.add("implant.exe", "d41d8cd98f00b204e9800998ecf8427e").await?;
//!
//!     // ... later
//!     snitch.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `virustotal` - VirusTotal v3 API provider
//! - `xforce` - IBM X-Force Exchange provider
//! - `all-providers` - Both of the above
//!
//! ## Architecture
//!
//! - **Core**: Samples, results, errors and the provider contract
//! - **Providers**: Concrete threat-intel lookups
//! - **Scheduler**: Per-provider scan loops and the coordinating [`Snitch`]
//! - **Ingest**: Hashing files on disk into samples

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod ingest;
pub mod providers;
pub mod scheduler;

// Re-export commonly used types at the crate root
pub use crate::core::{
    PendingList, Provider, Sample, ScanError, ScanResult, SnitchError, SnitchResult,
};

pub use crate::scheduler::{ScanLoopConfig, Snitch, SnitchBuilder, SnitchConfig};

/// Prelude module for convenient imports.
///
/// ```rust
/// use snitch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        ArcProvider, PendingList, Provider, Sample, ScanError, ScanResult, SnitchError,
        SnitchResult,
    };
    pub use crate::ingest::{hash_directory, SampleHasher};
    pub use crate::providers::{MockProvider, MockResponse};
    pub use crate::scheduler::{ScanLoopConfig, Snitch, SnitchBuilder, SnitchConfig};
}
