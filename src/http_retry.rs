//! Playlist request with automatic retry and backoff.
//!
//! Only the request/response head is retried. Once a 2xx response is
//! returned the caller streams the body and any later failure is final.

use reqwest::{Client, Response};
use std::time::Duration;
use tracing::warn;

use crate::error::FetchError;

/// Default number of fetch attempts (no retry).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Default backoff between attempts in milliseconds.
pub const DEFAULT_BACKOFF_MS: u64 = 500;

/// Configuration for [`send_with_retry`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts (minimum 1; 0 is treated as 1).
    pub max_attempts: u32,
    /// Sleep duration between consecutive attempts.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }
}

/// GET `url`, retrying transport errors and non-2xx statuses.
///
/// # Errors
///
/// Returns the failure of the last attempt: [`FetchError::Transport`] for
/// network errors and timeouts, [`FetchError::Status`] for non-2xx responses.
pub async fn send_with_retry(
    client: &Client,
    url: &str,
    config: &RetryConfig,
) -> Result<Response, FetchError> {
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match client.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                warn!(
                    "Playlist fetch returned {} for {} (attempt {}/{})",
                    response.status(),
                    url,
                    attempt,
                    max_attempts
                );
                Err(FetchError::Status {
                    status: response.status().as_u16(),
                    url: url.to_string(),
                })
            }
            Err(e) => {
                warn!(
                    "Playlist fetch failed for {} (attempt {}/{}): {}",
                    url, attempt, max_attempts, e
                );
                Err(FetchError::Transport(e))
            }
        };

        if attempt >= max_attempts {
            return result;
        }

        warn!("Retrying playlist fetch in {}ms...", config.backoff.as_millis());
        tokio::time::sleep(config.backoff).await;
        attempt += 1;
    }
}
