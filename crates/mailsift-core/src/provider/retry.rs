//! Bounded exponential backoff for Google API calls.

use std::time::Duration;

use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::warn;

/// Longest `Retry-After` we honor.
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// How often and how long to retry a transient failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff_ms: u64,
    /// Delay ceiling.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff before retrying after `attempt` (1-based), without jitter.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(
            self.initial_backoff_ms
                .saturating_mul(exponent)
                .min(self.max_backoff_ms),
        )
    }

    fn delay(&self, attempt: u32, retry_after: Option<&HeaderValue>) -> Duration {
        if let Some(secs) = retry_after
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            return Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS));
        }
        self.backoff(attempt) + jitter()
    }
}

fn jitter() -> Duration {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::from(d.subsec_nanos()));
    Duration::from_millis(nanos % 150)
}

/// Rate limits, request timeouts and server errors are worth another try.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Sends `request`, retrying transient failures per `policy`.
///
/// The last response is returned as-is once attempts run out, so callers still
/// see the final status.
///
/// # Errors
///
/// Returns the transport error of the final attempt.
pub async fn send_with_retry(
    request: RequestBuilder,
    policy: &RetryPolicy,
) -> Result<Response, reqwest::Error> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let Some(cloned) = request.try_clone() else {
            return request.send().await;
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if attempt < attempts && is_retryable_status(status) {
                    let delay = policy.delay(attempt, response.headers().get(RETRY_AFTER));
                    warn!("Gmail retry {attempt}/{attempts} after status {status} (sleep {delay:?})");
                    tokio::time::sleep(delay).await;
                } else {
                    return Ok(response);
                }
            }
            Err(err) => {
                if attempt < attempts && (err.is_timeout() || err.is_connect()) {
                    let delay = policy.delay(attempt, None);
                    warn!("Gmail retry {attempt}/{attempts} after transport error: {err} (sleep {delay:?})");
                    tokio::time::sleep(delay).await;
                } else {
                    return Err(err);
                }
            }
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_bounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_millis(500));
        assert_eq!(policy.backoff(3), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(10), Duration::from_millis(2_000));
    }

    #[test]
    fn test_retry_after_header_wins() {
        let policy = RetryPolicy::default();
        let header = HeaderValue::from_static("7");
        assert_eq!(policy.delay(1, Some(&header)), Duration::from_secs(7));

        let huge = HeaderValue::from_static("3600");
        assert_eq!(policy.delay(1, Some(&huge)), Duration::from_secs(30));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
    }
}
