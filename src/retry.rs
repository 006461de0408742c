//! Bounded retry with a Fibonacci backoff.
//!
//! Dependency services (Postgres, RabbitMQ) usually need a few seconds to
//! accept connections after their containers start. [`Retrier::run`] keeps
//! re-attempting an operation, sleeping `2, 3, 5, 8, 13, …` delay units
//! between attempts, and gives up with [`Error::RetryExhausted`] carrying the
//! last failure's message. Sleeps race a [`CancellationToken`] so an operator
//! abort never waits out the remaining budget.

use crate::error::{Error, Result};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of re-attempts after the first try.
pub const DEFAULT_MAX_RETRIES: u32 = 7;

/// Default length of one backoff unit.
pub const DEFAULT_DELAY_UNIT: Duration = Duration::from_secs(1);

/// Fibonacci sequence seeded `(1, 1)`, yielding `2, 3, 5, 8, 13, …`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    prev: u64,
    curr: u64,
}

impl FibonacciBackoff {
    pub fn new() -> Self {
        Self { prev: 1, curr: 1 }
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for FibonacciBackoff {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let next = self.prev.checked_add(self.curr)?;
        self.prev = self.curr;
        self.curr = next;
        Some(next)
    }
}

/// Retry budget for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-attempts after the first try; the operation runs at most `max_retries + 1` times.
    pub max_retries: u32,
    /// Duration of one Fibonacci unit.
    pub delay_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay_unit: Duration) -> Self {
        Self {
            max_retries,
            delay_unit,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// The sleeps taken between attempts, in order. There are exactly
    /// `max_retries` of them: none follows the final attempt.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        FibonacciBackoff::new()
            .take(self.max_retries as usize)
            .map(move |units| {
                let units = u32::try_from(units).unwrap_or(u32::MAX);
                self.delay_unit.saturating_mul(units)
            })
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_DELAY_UNIT)
    }
}

/// Runs one operation at a time under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    /// Run `operation` until it succeeds or the budget is spent.
    ///
    /// `label` names the operation in errors and logs. When `message` is set it
    /// is logged once per attempt, before the operation runs.
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        message: Option<&str>,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        let attempts = self.policy.max_attempts();
        let mut delays = self.policy.delays();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled(label.to_string()));
            }

            if let Some(message) = message {
                tracing::info!("{}", message);
            }

            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}/{}", label, attempt, attempts);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    last_error = e.to_string();
                    tracing::debug!(
                        "{} attempt {}/{} failed: {}",
                        label,
                        attempt,
                        attempts,
                        last_error
                    );
                }
            }

            if let Some(delay) = delays.next() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        tracing::debug!("{} retry cancelled during backoff", label);
                        return Err(Error::Cancelled(label.to_string()));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(Error::RetryExhausted {
            check: label.to_string(),
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn fibonacci_starts_at_two() {
        let delays: Vec<u64> = FibonacciBackoff::new().take(5).collect();
        assert_eq!(delays, vec![2, 3, 5, 8, 13]);
    }

    #[test]
    fn policy_has_one_delay_per_retry() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(20),
                Duration::from_millis(30),
                Duration::from_millis(50)
            ]
        );
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn zero_retries_means_no_delays() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.delays().count(), 0);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let retrier = Retrier::new(RetryPolicy::new(5, Duration::ZERO), CancellationToken::new());

        let counter = Arc::clone(&calls);
        let result = retrier
            .run("flaky", None, || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(format!("attempt {} refused", n))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhaustion_carries_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let retrier = Retrier::new(RetryPolicy::new(2, Duration::ZERO), CancellationToken::new());

        let counter = Arc::clone(&calls);
        let err = retrier
            .run("Postgresql", Some("Checking Postgresql connection..."), || {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    Err::<(), _>(format!("refused #{}", n))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            Error::RetryExhausted { check, message } => {
                assert_eq!(check, "Postgresql");
                assert_eq!(message, "refused #3");
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_follow_fibonacci_and_skip_the_last_attempt() {
        let retrier = Retrier::new(RetryPolicy::new(3, Duration::from_secs(1)), CancellationToken::new());
        let start = tokio::time::Instant::now();

        let _ = retrier
            .run("never", None, || async { Err::<(), _>("down") })
            .await;

        // 2 + 3 + 5 between four attempts, nothing after the last one.
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let token = CancellationToken::new();
        let retrier = Retrier::new(RetryPolicy::new(7, Duration::from_secs(60)), token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            token.cancel();
        });

        let start = tokio::time::Instant::now();
        let err = retrier
            .run("Rabbitmq", None, || async { Err::<(), _>("down") })
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, Error::Cancelled(ref label) if label == "Rabbitmq"));
        assert!(start.elapsed() < Duration::from_secs(120));
    }
}
