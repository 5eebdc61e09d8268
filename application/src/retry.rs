//! Bounded retry with backoff for flaky external calls.
//!
//! [`with_retry`] wraps any async operation. Each attempt is bounded by the
//! policy's timeout, transient errors are retried after a backoff delay, and
//! the final outcome is returned to the caller. Running out of attempts is a
//! normal outcome, not a panic or an error.

use crate::ports::generation::GenerationError;
use crate::ports::sleeper::Sleeper;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay growth between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    #[default]
    Fixed,
    Exponential,
}

/// Retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor for [`Backoff::Exponential`]
    pub multiplier: f64,
    /// Upper bound on a single attempt
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Backoff::Fixed,
            initial_delay: Duration::from_millis(1500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            attempt_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no delay
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff, initial_delay: Duration) -> Self {
        self.backoff = backoff;
        self.initial_delay = initial_delay;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = match self.backoff {
            Backoff::Fixed => self.initial_delay,
            Backoff::Exponential => {
                let factor = self.multiplier.max(1.0).powi(attempt.saturating_sub(1) as i32);
                self.initial_delay.mul_f64(factor.min(1e6))
            }
        };
        delay.min(self.max_delay)
    }
}

/// Errors that can be classified for retry
pub trait Retryable: Sized {
    fn is_transient(&self) -> bool;

    /// Error used when an attempt exceeds its timeout
    fn timed_out(after: Duration) -> Self;
}

impl Retryable for GenerationError {
    fn is_transient(&self) -> bool {
        GenerationError::is_transient(self)
    }

    fn timed_out(after: Duration) -> Self {
        GenerationError::Timeout(after.as_secs())
    }
}

/// Final result of a retried operation
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    /// Gave up, either out of attempts or on a non-transient error
    Exhausted { last_error: E, attempts: u32 },
}

/// Run `op` under `policy`.
///
/// `op` receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> RetryOutcome<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let result = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, op(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out(limit)),
            },
            None => op(attempt).await,
        };

        let error = match result {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Err(e) => e,
        };

        if !error.is_transient() || attempt >= max_attempts {
            warn!(attempt, max_attempts, "Giving up: {}", error);
            return RetryOutcome::Exhausted {
                last_error: error,
                attempts: attempt,
            };
        }

        let delay = policy.delay_after(attempt);
        debug!(attempt, ?delay, "Transient failure, retrying: {}", error);
        sleeper.sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Records requested delays instead of sleeping
    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn policy(attempts: u32, backoff: Backoff) -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(attempts)
            .with_backoff(backoff, Duration::from_millis(100))
    }

    #[test]
    fn test_fixed_delay() {
        let p = policy(3, Backoff::Fixed);
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(5), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let mut p = policy(10, Backoff::Exponential);
        p.max_delay = Duration::from_millis(500);
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(2), Duration::from_millis(200));
        assert_eq!(p.delay_after(3), Duration::from_millis(400));
        assert_eq!(p.delay_after(4), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);
        let outcome = with_retry(&policy(3, Backoff::Exponential), &sleeper, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(GenerationError::RateLimited)
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: "done",
                attempts: 3
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_is_reported() {
        let sleeper = RecordingSleeper::default();
        let outcome: RetryOutcome<(), _> = with_retry(&policy(2, Backoff::Fixed), &sleeper, |_| async {
            Err(GenerationError::Unavailable("503".to_string()))
        })
        .await;

        assert!(matches!(
            outcome,
            RetryOutcome::Exhausted {
                last_error: GenerationError::Unavailable(_),
                attempts: 2,
            }
        ));
        assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_transient_fails_fast() {
        let sleeper = RecordingSleeper::default();
        let outcome: RetryOutcome<(), _> = with_retry(&policy(5, Backoff::Fixed), &sleeper, |_| async {
            Err(GenerationError::InvalidResponse("garbage".to_string()))
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 1, .. }));
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_transient() {
        let sleeper = RecordingSleeper::default();
        let p = policy(2, Backoff::Fixed).with_attempt_timeout(Some(Duration::from_secs(1)));
        let outcome = with_retry(&p, &sleeper, |attempt| async move {
            if attempt == 1 {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok::<_, GenerationError>(attempt)
        })
        .await;

        assert_eq!(
            outcome,
            RetryOutcome::Succeeded {
                value: 2,
                attempts: 2
            }
        );
    }
}
