//! Retry loop with capped exponential backoff
//!
//! The retry state lives entirely in the loop below: each call to
//! [`retry_with_backoff`] starts from attempt zero and shares nothing with
//! other calls.

use crate::{FetchError, FetchErrorKind};
use std::future::Future;
use std::time::Duration;

/// Backoff parameters for a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each later retry
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Returns the wait before retry number `attempt + 1`
    ///
    /// `base * 2^attempt`, saturating, then capped at `max_delay`.
    ///
    /// | attempt | base = 500ms |
    /// |---------|--------------|
    /// | 0 | 500ms |
    /// | 1 | 1s |
    /// | 2 | 2s |
    /// | 3 | 4s |
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Executes `operation` until it succeeds, fails permanently, or the retry
/// budget is spent
///
/// The closure receives the zero-based attempt number. Only errors whose
/// [`FetchErrorKind::is_transient`] is true are retried. The returned error
/// carries the total number of attempts made.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    url: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchErrorKind>>,
{
    let mut attempt = 0u32;

    loop {
        let kind = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(kind) => kind,
        };

        if !kind.is_transient() || attempt >= policy.max_retries {
            return Err(FetchError {
                url: url.to_string(),
                kind,
                attempts: attempt + 1,
            });
        }

        let delay = policy.backoff_delay(attempt);
        tracing::warn!(
            url,
            attempt = attempt + 1,
            error_kind = kind.label(),
            backoff_ms = delay.as_millis() as u64,
            "Transient fetch failure ({}), retrying",
            kind
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };

        assert_eq!(policy.backoff_delay(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(3));
        assert_eq!(policy.backoff_delay(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(policy(3), "https://example.com", |_| {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(FetchErrorKind::Timeout)
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> =
            retry_with_backoff(policy(2), "https://example.com", |_| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(FetchErrorKind::HttpStatus(502))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, FetchErrorKind::HttpStatus(502));
        assert_eq!(err.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> =
            retry_with_backoff(policy(5), "https://example.com", |_| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(FetchErrorKind::HttpStatus(404))
                }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempt_number_is_passed_to_operation() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _: Result<(), _> = retry_with_backoff(policy(2), "https://example.com", |attempt| {
            s.lock().unwrap().push(attempt);
            async { Err(FetchErrorKind::ConnectionRefused) }
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }
}
