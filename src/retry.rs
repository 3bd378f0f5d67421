//! Bounded retry combinator
//!
//! Network fetches and storage writes both retry transient failures. The
//! policy (attempt budget and backoff shape) is a plain value so it can be
//! configured and asserted on in tests.

use crate::clock::Clock;
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed(Duration),

    /// `step × n` before the n-th retry (5s, 10s, 15s for a 5s step)
    Linear(Duration),
}

/// Attempt budget plus backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    pub backoff: Backoff,
}

/// The error that ended a retried operation
#[derive(Debug)]
pub struct RetryFailure<E> {
    /// How many attempts were made
    pub attempts: u32,

    /// The last error observed
    pub error: E,
}

impl RetryPolicy {
    /// `retries` extra attempts with linearly growing delay
    pub fn linear(retries: u32, step: Duration) -> Self {
        Self {
            max_attempts: retries + 1,
            backoff: Backoff::Linear(step),
        }
    }

    /// `attempts` total attempts with a fixed delay between them
    pub fn fixed(attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: attempts.max(1),
            backoff: Backoff::Fixed(delay),
        }
    }

    /// Delay before the given retry (1 = first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Linear(step) => step.saturating_mul(retry),
        }
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget runs out
    ///
    /// `op` receives the 1-based attempt number. Only errors for which
    /// `is_transient` returns true are retried.
    pub async fn run<C, T, E, F, Fut, P>(
        &self,
        clock: &C,
        what: &str,
        mut op: F,
        is_transient: P,
    ) -> Result<T, RetryFailure<E>>
    where
        C: Clock,
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if is_transient(&error) && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        what,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Transient failure, retrying"
                    );
                    clock.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    return Err(RetryFailure {
                        attempts: attempt,
                        error,
                    })
                }
            }
        }
    }
}
