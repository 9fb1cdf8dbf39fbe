// Retry with exponential backoff for best-effort outbound calls

use std::future::Future;
use std::time::Duration;

/// Exponential backoff settings
///
/// ```
/// use socialspot_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(4);
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(1));
/// assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including initial)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Upper bound for any single delay
    pub max_interval: Duration,
    pub backoff_coefficient: f64,
}

impl RetryPolicy {
    /// 1s, 2s, 4s, ... between attempts
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            backoff_coefficient: 2.0,
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            backoff_coefficient: 1.0,
        }
    }

    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    /// Delay to wait before `attempt` (1-based); zero for the first attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let retry_num = attempt - 1;
        let base = self.initial_interval.as_secs_f64()
            * self.backoff_coefficient.powi(retry_num as i32 - 1);
        Duration::from_secs_f64(base.min(self.max_interval.as_secs_f64()))
    }

    pub fn has_attempts_remaining(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }

    /// Run `op` until it succeeds or attempts run out; returns the last error.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if self.has_attempts_remaining(attempt) => {
                    tracing::warn!(attempt, error = %e, "Attempt failed, retrying");
                    attempt += 1;
                    tokio::time::sleep(self.delay_for_attempt(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
