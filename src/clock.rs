//! Wall-clock abstraction
//!
//! Quota windows, retry backoff, and request pacing all read the time and
//! sleep through a `Clock`, so tests can run a whole simulated day instantly.

use chrono::{Days, Local, NaiveDateTime};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Source of local time and of suspension
pub trait Clock: Send + Sync {
    /// Current local wall-clock time
    fn now(&self) -> NaiveDateTime;

    /// Suspends the caller for `duration`
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// The real clock: local time and `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// A manually driven clock
///
/// Sleeping advances the simulated time immediately and records the requested
/// duration. Clones share the same timeline.
#[derive(Debug, Clone)]
pub struct SimulatedClock {
    inner: Arc<Mutex<SimulatedState>>,
}

#[derive(Debug)]
struct SimulatedState {
    now: NaiveDateTime,
    sleeps: Vec<Duration>,
}

impl SimulatedClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimulatedState {
                now: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// Moves time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.now +=
            chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sleeps
            .clone()
    }

    /// Total simulated time spent sleeping
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for SimulatedClock {
    fn now(&self) -> NaiveDateTime {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).now
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        {
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            state.now +=
                chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero());
            state.sleeps.push(duration);
        }
        std::future::ready(())
    }
}

/// Time remaining until the next local midnight
pub fn until_next_midnight(now: NaiveDateTime) -> Duration {
    let next_midnight = now
        .date()
        .checked_add_days(Days::new(1))
        .and_then(|day| day.and_hms_opt(0, 0, 0));

    match next_midnight {
        Some(midnight) => (midnight - now).to_std().unwrap_or(Duration::ZERO),
        None => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_until_next_midnight() {
        assert_eq!(until_next_midnight(at(23, 0)), Duration::from_secs(3600));
        assert_eq!(until_next_midnight(at(0, 0)), Duration::from_secs(24 * 3600));
        assert_eq!(until_next_midnight(at(12, 30)), Duration::from_secs(11 * 3600 + 1800));
    }

    #[tokio::test]
    async fn test_simulated_sleep_advances_time() {
        let clock = SimulatedClock::new(at(23, 0));
        clock.sleep(Duration::from_secs(7200)).await;

        assert_eq!(clock.now(), at(1, 0) + chrono::Duration::days(1));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(7200)]);
    }

    #[test]
    fn test_clones_share_timeline() {
        let clock = SimulatedClock::new(at(8, 0));
        let other = clock.clone();
        other.advance(Duration::from_secs(60));
        assert_eq!(clock.now(), at(8, 1));
        assert!(clock.sleeps().is_empty());
    }
}
