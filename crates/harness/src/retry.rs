//! Retry policy for network-facing checks.
//!
//! Every HTTP-facing check goes through the same combinator: a bounded
//! number of attempts with a fixed delay between them. Exhausting the
//! budget demotes a transient error to a recorded failure, it never crashes
//! the run.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

/// Retry configuration for check operations.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub delay: Duration,
    /// Multiplier applied to the delay after each attempt. The harness
    /// default is 1.0 (fixed delay between attempts).
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryConfig {
    /// Fixed-delay policy with the given budget.
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff_multiplier: 1.0,
        }
    }

    /// Single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    /// Delay to sleep before retrying after the given zero-based attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.try_into().unwrap_or(i32::MAX));
        Duration::from_secs_f64(self.delay.as_secs_f64() * factor)
    }
}

/// Execute an async operation with retry.
///
/// # Errors
/// Returns the final error once all attempts are exhausted.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation_name: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_attempts {
                    return Err(e)
                        .context(format!("{operation_name} failed after {attempt} attempts"));
                }

                let delay = config.delay_for_attempt(attempt - 1);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_fixed_delay_does_not_grow() {
        let config = RetryConfig::fixed(5, Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(200));
    }

    #[test]
    fn test_backoff_multiplier_grows_delay() {
        let config = RetryConfig {
            max_attempts: 4,
            delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(3, Duration::from_millis(1));

        let result = with_retry(config, "flaky-op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    anyhow::bail!("transient");
                }
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_error() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig::fixed(3, Duration::from_millis(1));

        let result: Result<()> = with_retry(config, "always-down", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { anyhow::bail!("connection refused") }
        })
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("always-down failed after 3 attempts"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_policy_tries_once() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(RetryConfig::none(), "one-shot", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { anyhow::bail!("nope") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
