//! HTTP plumbing shared by the REST-based providers.

use crate::core::ScanError;

use reqwest::{header, Response, StatusCode};
use std::time::Duration;

/// Builds the HTTP client a provider keeps for its lifetime.
pub(crate) fn build_client(provider: &str, timeout: Duration) -> Result<reqwest::Client, ScanError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            ScanError::configuration(format!("failed to create HTTP client for {provider}: {e}"))
        })
}

/// Maps a lookup response to the provider contract.
///
/// `Ok(None)` means the provider has never seen the hash; `Ok(Some(body))`
/// carries the parsed JSON of a successful lookup.
pub(crate) async fn lookup_body(
    provider: &str,
    response: Response,
) -> Result<Option<serde_json::Value>, ScanError> {
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ScanError::RateLimited {
            provider: provider.to_string(),
            retry_after,
        });
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ScanError::AuthenticationFailed {
            provider: provider.to_string(),
            reason: format!("API answered {status}"),
        });
    }

    if !status.is_success() {
        return Err(ScanError::provider_unavailable(
            provider,
            format!("API error: {status}"),
        ));
    }

    let body = response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| ScanError::malformed(provider, e.to_string()))?;
    Ok(Some(body))
}

/// Maps a transport failure.
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> ScanError {
    if error.is_timeout() {
        ScanError::connection_failed(provider, format!("request timed out: {error}"))
    } else {
        ScanError::connection_failed(provider, error.to_string())
    }
}
