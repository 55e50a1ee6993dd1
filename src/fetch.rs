//! Fetch a manifest over HTTP and stream it into a [`ManifestAccumulator`].
//!
//! The initial request is retried with a fixed backoff; once a 2xx response
//! arrives its body is fed chunk by chunk, so decoding starts before the
//! download completes.

use crate::accumulator::{Encoding, ManifestAccumulator};
use crate::error::{MssError, Result};
use crate::manifest::Manifest;
use crate::metrics;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

/// Default number of fetch attempts (1 initial + 1 retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Default backoff between attempts in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Retry policy for the manifest request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Total number of attempts (0 is treated as 1)
    pub max_attempts: u32,
    pub backoff: Duration,
    /// Per-attempt timeout; `None` leaves the client's own timeout in place
    pub timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
            timeout: None,
        }
    }
}

/// Download and parse the manifest at `url`.
///
/// # Errors
/// - [`MssError::InvalidUrl`] for unparsable or non-HTTP(S) URLs
/// - [`MssError::Fetch`] when every attempt fails or the body stream breaks
/// - any decode, markup or structure error from the accumulator
pub async fn fetch_manifest(
    client: &Client,
    url: &str,
    config: &FetchConfig,
    encoding: Encoding,
) -> Result<Arc<Manifest>> {
    let url = validate_manifest_url(url)?;
    let response = get_with_retry(client, &url, config).await?;

    info!("Streaming manifest from {} as {}", url, encoding);
    let mut accumulator = ManifestAccumulator::new(encoding);
    accumulator
        .feed(response.bytes_stream(), |e| {
            MssError::Fetch(format!("body stream from {} broke: {}", url, e))
        })
        .await
}

/// Accept only absolute `http://` and `https://` URLs.
pub fn validate_manifest_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| MssError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(MssError::InvalidUrl(format!(
            "Scheme '{scheme}' not allowed, only http/https"
        ))),
    }
}

async fn get_with_retry(client: &Client, url: &Url, config: &FetchConfig) -> Result<Response> {
    let max_attempts = config.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            warn!("Retrying manifest fetch in {}ms...", config.backoff.as_millis());
            metrics::record_fetch_retry();
            tokio::time::sleep(config.backoff).await;
        }

        let mut request = client.get(url.clone());
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                warn!(
                    "Manifest fetch returned {} for {} (attempt {}/{})",
                    response.status(),
                    url,
                    attempt,
                    max_attempts
                );
                last_error = format!("HTTP {} from {}", response.status(), url);
            }
            Err(e) => {
                warn!(
                    "Manifest fetch failed for {} (attempt {}/{}): {}",
                    url, attempt, max_attempts, e
                );
                last_error = e.to_string();
            }
        }
    }

    Err(MssError::Fetch(last_error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_config_defaults() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(cfg.backoff, Duration::from_millis(DEFAULT_BACKOFF_MS));
        assert!(cfg.timeout.is_none());
    }

    #[test]
    fn accepts_http_and_https() {
        assert!(validate_manifest_url("http://example.com/video.ism/Manifest").is_ok());
        assert!(validate_manifest_url("https://example.com/video.ism/Manifest").is_ok());
    }

    #[test]
    fn rejects_other_schemes_and_relative_urls() {
        assert!(matches!(
            validate_manifest_url("ftp://example.com/Manifest"),
            Err(MssError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_manifest_url("file:///tmp/Manifest"),
            Err(MssError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_manifest_url("video.ism/Manifest"),
            Err(MssError::InvalidUrl(_))
        ));
    }
}
