use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Delays between attempts: the escalating `base_delays` first, then
/// `final_retries` more attempts spaced by `final_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delays: Vec<Duration>,
    pub final_retries: usize,
    pub final_delay: Duration,
}

impl Default for RetryPolicy {
    // 2s, 4s, 6s, 8s, then 10s x 3
    fn default() -> Self {
        Self {
            base_delays: [2, 4, 6, 8].map(Duration::from_secs).to_vec(),
            final_retries: 3,
            final_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            base_delays: Vec::new(),
            final_retries: 0,
            final_delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> usize {
        (self.base_delays.len() + self.final_retries).max(1)
    }

    fn delay_after(&self, attempt: usize) -> Duration {
        self.base_delays
            .get(attempt - 1)
            .copied()
            .unwrap_or(self.final_delay)
    }
}

/// Retry an async operation with exponential backoff.
///
/// # Returns
/// The result of the operation if successful, or the last error once
/// `policy.max_attempts()` attempts have failed
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
{
    let total = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if attempt >= total => return Err(e),
            Err(e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "Request failed (attempt {}/{}): {e}. Retrying after {}ms...",
                    attempt,
                    total,
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            base_delays: vec![Duration::from_millis(1), Duration::from_millis(2)],
            final_retries: 2,
            final_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retry_succeeds_on_first_attempt() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), String>(())
                }
            },
            &fast_policy(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(String::from("fail"))
                    } else {
                        Ok(())
                    }
                }
            },
            &fast_policy(),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_fails_after_all_attempts() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(String::from("fail"))
                }
            },
            &fast_policy(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4); // 2 base + 2 final
    }

    #[tokio::test]
    async fn none_policy_tries_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let result: std::result::Result<(), String> = retry_with_backoff(
            || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(String::from("fail"))
                }
            },
            &RetryPolicy::none(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_policy_matches_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 7);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after(5), Duration::from_secs(10));
    }
}
