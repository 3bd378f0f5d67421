use chrono::NaiveDate;

/// Daily request accounting
///
/// Owned by the quota gate and never persisted: after a restart the counter
/// starts at zero and the window realigns at the next midnight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaState {
    /// Requests granted in the current window
    pub requests_used: u32,

    /// Date of the current window (None until the first request)
    pub window_start_date: Option<NaiveDate>,
}

impl QuotaState {
    /// Creates an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the counter if `today` starts a new window
    ///
    /// Returns true if a reset happened.
    pub fn roll_window(&mut self, today: NaiveDate) -> bool {
        match self.window_start_date {
            Some(date) if date != today => {
                self.requests_used = 0;
                self.window_start_date = Some(today);
                true
            }
            _ => false,
        }
    }

    /// Checks whether the daily budget is spent
    pub fn is_exhausted(&self, daily_limit: u32) -> bool {
        self.requests_used >= daily_limit
    }

    /// Records a granted request
    pub fn record_request(&mut self, today: NaiveDate) {
        self.requests_used += 1;
        self.window_start_date = Some(today);
    }
}
