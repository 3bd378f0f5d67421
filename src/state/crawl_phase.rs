/// Crawl driver phase definitions
///
/// The driver moves through these phases once per page and validates every
/// transition, so a bug in the loop surfaces as an error instead of a skipped
/// checkpoint.
use std::fmt;

/// Current phase of the crawl driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Startup =====
    /// Driver constructed, nothing read yet
    Init,

    /// Reading the checkpoint
    LoadCheckpoint,

    // ===== Per-page cycle =====
    /// Waiting for the daily quota to allow another request
    AcquireQuota,

    /// Requesting the next page of the current key
    FetchPages,

    /// Normalizing results and writing them to the dictionary
    NormalizeAndStore,

    /// Persisting the new resume point
    AdvanceCheckpoint,

    // ===== Terminal =====
    /// Every key was crawled (or the run's key limit was reached)
    Done,

    /// Interrupted or failed; the last saved checkpoint is the recovery point
    Aborted,
}

impl CrawlPhase {
    /// Returns true for Done and Aborted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Returns true if the driver may move from this phase to `next`
    ///
    /// Any non-terminal phase may abort.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        if next == Self::Aborted {
            return !self.is_terminal();
        }

        matches!(
            (self, next),
            (Self::Init, Self::LoadCheckpoint)
                | (Self::LoadCheckpoint, Self::AcquireQuota)
                | (Self::LoadCheckpoint, Self::Done)
                | (Self::AcquireQuota, Self::FetchPages)
                | (Self::FetchPages, Self::NormalizeAndStore)
                | (Self::NormalizeAndStore, Self::AdvanceCheckpoint)
                | (Self::AdvanceCheckpoint, Self::AcquireQuota)
                | (Self::AdvanceCheckpoint, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::LoadCheckpoint => "load_checkpoint",
            Self::AcquireQuota => "acquire_quota",
            Self::FetchPages => "fetch_pages",
            Self::NormalizeAndStore => "normalize_and_store",
            Self::AdvanceCheckpoint => "advance_checkpoint",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(CrawlPhase::Done.is_terminal());
        assert!(CrawlPhase::Aborted.is_terminal());

        assert!(!CrawlPhase::Init.is_terminal());
        assert!(!CrawlPhase::AcquireQuota.is_terminal());
        assert!(!CrawlPhase::AdvanceCheckpoint.is_terminal());
    }

    #[test]
    fn test_page_cycle() {
        let cycle = [
            CrawlPhase::AcquireQuota,
            CrawlPhase::FetchPages,
            CrawlPhase::NormalizeAndStore,
            CrawlPhase::AdvanceCheckpoint,
            CrawlPhase::AcquireQuota,
        ];
        for pair in cycle.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_checkpoint_cannot_be_skipped() {
        assert!(!CrawlPhase::NormalizeAndStore.can_transition_to(CrawlPhase::AcquireQuota));
        assert!(!CrawlPhase::FetchPages.can_transition_to(CrawlPhase::Done));
        assert!(!CrawlPhase::Init.can_transition_to(CrawlPhase::FetchPages));
    }

    #[test]
    fn test_abort_rules() {
        assert!(CrawlPhase::FetchPages.can_transition_to(CrawlPhase::Aborted));
        assert!(CrawlPhase::Init.can_transition_to(CrawlPhase::Aborted));
        assert!(!CrawlPhase::Done.can_transition_to(CrawlPhase::Aborted));
        assert!(!CrawlPhase::Aborted.can_transition_to(CrawlPhase::Aborted));
    }
}
