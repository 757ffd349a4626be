//! Error types for the snitch library.
//!
//! Two families are kept apart: [`ScanError`] describes a single failed
//! provider query and is absorbed by the scan loop, while [`SnitchError`]
//! describes setup and lifecycle failures that surface to the caller.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single provider query.
///
/// "The provider has never seen this sample" is not an error; providers
/// report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The provider is unavailable or answered with an unexpected status.
    #[error("provider '{provider}' is unavailable: {reason}")]
    ProviderUnavailable {
        /// Name of the provider.
        provider: String,
        /// Human-readable reason for unavailability.
        reason: String,
    },

    /// The query did not complete in time.
    #[error("scan timed out after {elapsed:?} on provider '{provider}'")]
    Timeout {
        /// Name of the provider that timed out.
        provider: String,
        /// How long the query ran before being abandoned.
        elapsed: Duration,
    },

    /// Failed to reach the provider.
    #[error("connection to provider '{provider}' failed: {message}")]
    ConnectionFailed {
        /// Name of the provider.
        provider: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The provider's quota is exhausted.
    #[error("rate limit exceeded for provider '{provider}': retry after {retry_after:?}")]
    RateLimited {
        /// Name of the provider.
        provider: String,
        /// Suggested wait time before retry.
        retry_after: Option<Duration>,
    },

    /// The provider rejected the credentials.
    #[error("authentication failed for provider '{provider}': {reason}")]
    AuthenticationFailed {
        /// Name of the provider.
        provider: String,
        /// Reason for authentication failure.
        reason: String,
    },

    /// The provider answered with something that could not be interpreted.
    #[error("malformed response from provider '{provider}': {details}")]
    MalformedResponse {
        /// Name of the provider.
        provider: String,
        /// What was missing or unparseable.
        details: String,
    },

    /// The provider is misconfigured (missing credentials, bad URL).
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

}

impl ScanError {
    /// Returns `true` if retrying the same query later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. }
                | Self::Timeout { .. }
                | Self::ConnectionFailed { .. }
                | Self::RateLimited { .. }
                | Self::MalformedResponse { .. }
        )
    }

    /// Returns the provider name if this error is associated with one.
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::ProviderUnavailable { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::ConnectionFailed { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::AuthenticationFailed { provider, .. }
            | Self::MalformedResponse { provider, .. } => Some(provider),
            _ => None,
        }
    }

    /// Creates a `ProviderUnavailable` error.
    pub fn provider_unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(provider: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            elapsed,
        }
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a `MalformedResponse` error.
    pub fn malformed(provider: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            details: details.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Setup and lifecycle errors of the [`Snitch`](crate::scheduler::Snitch)
/// coordinator.
#[derive(Debug, Error)]
pub enum SnitchError {
    /// `start` was called without any registered provider.
    #[error("at least one provider must be registered before starting")]
    NoProviders,

    /// `start` was called on a coordinator that already started.
    #[error("snitch has already been started")]
    AlreadyStarted,

    /// Samples can only be ingested between `start` and `stop`.
    #[error("snitch is not running")]
    NotRunning,

    /// A provider could not be set up.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// An I/O error occurred while collecting samples.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for coordinator operations.
pub type SnitchResult<T> = Result<T, SnitchError>;
