pub mod arm;
pub mod resource_graph;

use std::time::Duration;

pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Retry policy shared by the ARM and Resource Graph clients. 429 and 5xx
/// responses are retried; `Retry-After` wins over the computed delay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self { attempts, base_delay }
    }

    pub fn is_retryable(status: reqwest::StatusCode) -> bool {
        status.as_u16() == 429 || status.is_server_error()
    }

    /// Delay before the given retry attempt (0-based), doubling each time.
    pub fn delay_for(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        if let Some(secs) = retry_after_secs {
            return Duration::from_secs(secs);
        }
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

pub(crate) fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_header_overrides_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(3, Some(7)), Duration::from_secs(7));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(0, None), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1, None), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2, None), Duration::from_secs(4));
    }

    #[test]
    fn throttling_and_server_errors_are_retryable() {
        assert!(RetryPolicy::is_retryable(
            reqwest::StatusCode::TOO_MANY_REQUESTS
        ));
        assert!(RetryPolicy::is_retryable(
            reqwest::StatusCode::SERVICE_UNAVAILABLE
        ));
        assert!(!RetryPolicy::is_retryable(reqwest::StatusCode::FORBIDDEN));
        assert!(!RetryPolicy::is_retryable(reqwest::StatusCode::NOT_FOUND));
    }
}
