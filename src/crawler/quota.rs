//! Daily request quota
//!
//! The dictionary API allows a fixed number of requests per calendar day. The
//! gate hands out one permit per physical request and suspends the caller until
//! local midnight once the budget is spent. Exhaustion is never an error.

use crate::clock::{until_next_midnight, Clock};
use crate::state::QuotaState;
use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Proof that a request was counted against the quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct QuotaPermit {
    /// Position of this request within its day (1-based)
    pub number: u32,

    /// Day the request was counted against
    pub date: NaiveDate,
}

/// Daily request budget plus fixed request pacing
pub struct QuotaGate<C: Clock> {
    clock: C,
    daily_limit: u32,
    request_delay: Duration,
    state: Mutex<QuotaState>,
}

impl<C: Clock> QuotaGate<C> {
    pub fn new(clock: C, daily_limit: u32, request_delay: Duration) -> Self {
        Self {
            clock,
            daily_limit,
            request_delay,
            state: Mutex::new(QuotaState::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QuotaState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Grants a permit if the budget allows, otherwise returns how long to wait
    fn try_grant(&self) -> Result<QuotaPermit, Duration> {
        let now = self.clock.now();
        let today = now.date();
        let mut state = self.lock();

        if state.roll_window(today) {
            tracing::info!(date = %today, "Quota window reset");
        }

        if state.is_exhausted(self.daily_limit) {
            return Err(until_next_midnight(now));
        }

        state.record_request(today);
        Ok(QuotaPermit {
            number: state.requests_used,
            date: today,
        })
    }

    /// Takes one request from today's budget, waiting for midnight if needed
    pub async fn acquire(&self) -> QuotaPermit {
        loop {
            match self.try_grant() {
                Ok(permit) => return permit,
                Err(wait) => self.suspend(wait).await,
            }
        }
    }

    /// Waits until a permit would be granted, without taking one
    pub async fn ready(&self) {
        loop {
            let wait = {
                let now = self.clock.now();
                let mut state = self.lock();
                state.roll_window(now.date());
                if !state.is_exhausted(self.daily_limit) {
                    return;
                }
                until_next_midnight(now)
            };
            self.suspend(wait).await;
        }
    }

    async fn suspend(&self, wait: Duration) {
        tracing::warn!(
            daily_limit = self.daily_limit,
            wait_secs = wait.as_secs(),
            "Daily quota exhausted, sleeping until midnight"
        );
        // The wait is at least one second so a clock sitting exactly on
        // midnight cannot spin.
        self.clock.sleep(wait.max(Duration::from_secs(1))).await;
    }

    /// Fixed pause after a physical request
    pub async fn pace(&self) {
        if !self.request_delay.is_zero() {
            self.clock.sleep(self.request_delay).await;
        }
    }

    /// Requests counted in the current window
    pub fn requests_used(&self) -> u32 {
        self.lock().requests_used
    }

    /// Snapshot of the quota accounting
    pub fn state(&self) -> QuotaState {
        self.lock().clone()
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }
}
