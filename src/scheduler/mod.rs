//! Scheduling and coordination of provider scans.
//!
//! The [`Snitch`] coordinator owns the provider registry and fans every
//! ingested sample out to all providers. Each provider is driven by its own
//! [`ScanLoop`], which queries pending samples in batches of
//! `max_requests` and sleeps `threshold` after each batch.

mod config;
mod pacing;
mod scan_loop;
mod snitch;

pub use config::{ScanLoopConfig, SnitchConfig};
pub use pacing::{batch_count, batches, cool_down};
pub use scan_loop::{ResultHandler, RoundOutcome, RoundStats, ScanLoop};
pub use snitch::{FlaggedCallback, Snitch, SnitchBuilder};
