//! Core types and traits for the snitch library.
//!
//! - [`types`] - The `Sample` value type
//! - [`result`] - Positive detections (`ScanResult`)
//! - [`traits`] - The `Provider` capability contract
//! - [`pending`] - The lock-protected pending list providers embed
//! - [`error`] - Structured error types

pub mod error;
pub mod pending;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{ScanError, SnitchError, SnitchResult};
pub use pending::PendingList;
pub use result::ScanResult;
pub use traits::{ArcProvider, Provider};
pub use types::Sample;
