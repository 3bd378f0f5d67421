//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the main crawl loop that coordinates all aspects of
//! the crawling process, including:
//! - Loading the checkpoint and positioning the key-space
//! - Waiting on the daily quota
//! - Fetching pages, normalizing results, and storing words
//! - Saving the checkpoint after every committed page
//! - Handling interrupts and recording the run

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::crawler::fetcher::{FetchedPage, PagedFetcher};
use crate::hangul::{normalize, Consonant, Keyspace, SearchKey};
use crate::retry::RetryPolicy;
use crate::state::{CheckpointStore, CrawlPhase, CrawlProgress, FileCheckpoint};
use crate::storage::{insert_with_retry, InsertOutcome, RunKind, RunStatus, SqliteStorage, Storage};
use crate::{HarvestError, Result};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// Run-level knobs that are not part of fetching
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Consonant groups to crawl
    pub consonants: Vec<Consonant>,

    /// Stop cleanly after this many completed keys
    pub max_keys: Option<u64>,

    /// Reconnect policy for word inserts
    pub storage_retry: RetryPolicy,

    /// Recorded with the run
    pub config_hash: String,
}

impl CrawlSettings {
    pub fn from_config(config: &Config, config_hash: &str) -> Result<Self> {
        Ok(Self {
            consonants: config.crawler.consonant_set()?,
            max_keys: config.crawler.max_keys,
            storage_retry: config.storage.retry_policy(),
            config_hash: config_hash.to_string(),
        })
    }
}

/// Counters for one crawl run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub keys_completed: u64,
    pub pages_fetched: u64,
    pub words_inserted: u64,
    pub duplicates: u64,
    pub rejected: u64,
    pub storage_failures: u64,
}

/// How a run ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The configured key-space is exhausted
    Completed,

    /// `max-keys` keys were completed
    KeyLimitReached,

    /// Stopped by the shutdown signal
    Interrupted,
}

/// Result of a crawl run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub run_id: i64,
    pub outcome: CrawlOutcome,

    /// The recovery point: where the next run starts
    pub checkpoint: CrawlProgress,

    pub summary: CrawlSummary,
}

/// Main crawler coordinator structure
pub struct Coordinator<S: Storage, K: CheckpointStore, C: Clock + Clone> {
    storage: S,
    checkpoint: K,
    fetcher: PagedFetcher<C>,
    clock: C,
    settings: CrawlSettings,
    phase: CrawlPhase,
    summary: CrawlSummary,
    start: CrawlProgress,
}

impl Coordinator<SqliteStorage, FileCheckpoint, SystemClock> {
    /// Creates a coordinator backed by the configured database and checkpoint
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded with the run
    /// * `fresh` - Discard the checkpoint and start from the first key
    pub fn from_config(config: &Config, config_hash: &str, fresh: bool) -> Result<Self> {
        let api_key = config.api.resolve_key()?;
        let clock = SystemClock;
        let fetcher =
            PagedFetcher::from_config(&config.api, api_key, config.quota.daily_limit, clock)?;

        let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

        let mut checkpoint = FileCheckpoint::new(&config.checkpoint.path);
        if fresh {
            checkpoint.reset()?;
        }

        let settings = CrawlSettings::from_config(config, config_hash)?;
        Ok(Self::new(storage, checkpoint, fetcher, clock, settings))
    }
}

impl<S: Storage, K: CheckpointStore, C: Clock + Clone> Coordinator<S, K, C> {
    pub fn new(
        storage: S,
        checkpoint: K,
        fetcher: PagedFetcher<C>,
        clock: C,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            storage,
            checkpoint,
            fetcher,
            clock,
            settings,
            phase: CrawlPhase::Init,
            summary: CrawlSummary::default(),
            start: CrawlProgress::origin(),
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn checkpoint(&self) -> &K {
        &self.checkpoint
    }

    /// Runs until the key-space is exhausted or a fatal error occurs
    pub async fn run(&mut self) -> Result<CrawlReport> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until done, a fatal error, or `shutdown` resolves
    ///
    /// A quota wait or an in-flight fetch is abandoned on shutdown. Storing a
    /// fetched page and saving its checkpoint always run to completion.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<CrawlReport>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let run_id = self
            .storage
            .create_run(RunKind::Crawl, &self.settings.config_hash)?;
        tracing::info!(run_id, "Starting crawl run");

        let result = self.drive(run_id, shutdown).await;

        let status = match &result {
            Ok(report) if report.outcome == CrawlOutcome::Interrupted => RunStatus::Interrupted,
            Ok(_) => RunStatus::Completed,
            Err(e) => {
                if self.phase.can_transition_to(CrawlPhase::Aborted) {
                    self.phase = CrawlPhase::Aborted;
                }
                tracing::error!(
                    error = %e,
                    checkpoint = %self.recovery_point(),
                    "Crawl aborted; resume from the last checkpoint"
                );
                RunStatus::Failed
            }
        };

        if let Err(e) = self.storage.finish_run(run_id, status) {
            tracing::warn!(run_id, error = %e, "Failed to record run status");
        }

        result
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!(from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        Ok(())
    }

    fn recovery_point(&self) -> CrawlProgress {
        self.checkpoint.last_saved().unwrap_or(self.start)
    }

    fn report(&self, run_id: i64, outcome: CrawlOutcome) -> CrawlReport {
        CrawlReport {
            run_id,
            outcome,
            checkpoint: self.recovery_point(),
            summary: self.summary,
        }
    }

    fn interrupted(&mut self, run_id: i64) -> Result<CrawlReport> {
        self.transition(CrawlPhase::Aborted)?;
        let report = self.report(run_id, CrawlOutcome::Interrupted);
        tracing::info!(
            checkpoint = %report.checkpoint,
            "Crawl interrupted; progress is saved"
        );
        Ok(report)
    }

    fn finished(&mut self, run_id: i64, outcome: CrawlOutcome) -> Result<CrawlReport> {
        self.transition(CrawlPhase::Done)?;
        let report = self.report(run_id, outcome);
        tracing::info!(
            keys = report.summary.keys_completed,
            pages = report.summary.pages_fetched,
            inserted = report.summary.words_inserted,
            duplicates = report.summary.duplicates,
            rejected = report.summary.rejected,
            storage_failures = report.summary.storage_failures,
            checkpoint = %report.checkpoint,
            "Crawl finished"
        );
        Ok(report)
    }

    async fn drive<F>(&mut self, run_id: i64, mut shutdown: Pin<&mut F>) -> Result<CrawlReport>
    where
        F: Future<Output = ()>,
    {
        self.transition(CrawlPhase::LoadCheckpoint)?;
        self.start = self.checkpoint.load()?;
        tracing::info!(checkpoint = %self.start, "Loaded checkpoint");

        let mut keys = Keyspace::with_consonants(self.settings.consonants.iter().copied())
            .starting_at(self.start.consonant_index, self.start.syllable_index)
            .peekable();

        if keys.peek().is_none() {
            tracing::info!("Nothing left to crawl");
            return self.finished(run_id, CrawlOutcome::Completed);
        }

        while let Some(key) = keys.next() {
            let start_page = self.start.start_page_for(&key);
            let mut cursor = self.fetcher.pages(key, start_page);
            tracing::debug!(key = %key.syllable, start_page, "Starting key");

            loop {
                self.transition(CrawlPhase::AcquireQuota)?;
                let ready = tokio::select! {
                    biased;
                    _ = &mut shutdown => false,
                    _ = self.fetcher.gate().ready() => true,
                };
                if !ready {
                    return self.interrupted(run_id);
                }

                self.transition(CrawlPhase::FetchPages)?;
                let fetched = tokio::select! {
                    biased;
                    _ = &mut shutdown => None,
                    result = self.fetcher.next_page(&mut cursor) => Some(result),
                };
                let Some(fetched) = fetched else {
                    return self.interrupted(run_id);
                };
                let page = fetched?;

                self.transition(CrawlPhase::NormalizeAndStore)?;
                if let Some(page) = &page {
                    self.store_page(page).await;
                    self.summary.pages_fetched += 1;
                }

                self.transition(CrawlPhase::AdvanceCheckpoint)?;
                let key_done = page.as_ref().map_or(true, |p| p.is_last);
                let next = match &page {
                    Some(p) if !p.is_last => CrawlProgress::at_page(&key, p.number + 1),
                    _ => CrawlProgress::after_key(&key),
                };
                self.checkpoint.save(&next)?;

                if key_done {
                    self.summary.keys_completed += 1;
                    tracing::info!(
                        key = %key.syllable,
                        last_page = cursor.next_page_number().saturating_sub(1),
                        total_inserted = self.summary.words_inserted,
                        "Key complete"
                    );
                    break;
                }
            }

            if keys.peek().is_none() {
                break;
            }
            if let Some(max_keys) = self.settings.max_keys {
                if self.summary.keys_completed >= max_keys {
                    tracing::info!(max_keys, "Key limit reached");
                    return self.finished(run_id, CrawlOutcome::KeyLimitReached);
                }
            }
        }

        self.finished(run_id, CrawlOutcome::Completed)
    }

    /// Normalizes and stores every result of a page
    ///
    /// Rejections and storage failures are counted and logged; neither stops
    /// the crawl.
    async fn store_page(&mut self, page: &FetchedPage) {
        let key: SearchKey = page.key;

        for raw in &page.results {
            let word = match normalize(raw) {
                Ok(word) => word,
                Err(rejection) => {
                    tracing::debug!(
                        key = %key.syllable,
                        page = page.number,
                        word = %raw.word,
                        %rejection,
                        "Rejected result"
                    );
                    self.summary.rejected += 1;
                    continue;
                }
            };

            let outcome = insert_with_retry(
                &mut self.storage,
                &word,
                &self.settings.storage_retry,
                &self.clock,
            )
            .await;

            match outcome {
                Ok(InsertOutcome::Inserted) => self.summary.words_inserted += 1,
                Ok(InsertOutcome::Duplicate) => self.summary.duplicates += 1,
                Err(failure) => {
                    tracing::error!(
                        key = %key.syllable,
                        page = page.number,
                        word = %word.word,
                        attempts = failure.attempts,
                        error = %failure.error,
                        "Failed to store word, skipping"
                    );
                    self.summary.storage_failures += 1;
                }
            }
        }

        tracing::debug!(
            key = %key.syllable,
            page = page.number,
            results = page.results.len(),
            repeated = page.repeated,
            total = ?page.total_count,
            "Page stored"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulatedClock;
    use crate::crawler::QuotaGate;
    use crate::hangul::NormalizedWord;
    use crate::state::MemoryCheckpoint;
    use crate::storage::{DictionaryStore, RunRecord, StorageError, StorageResult};
    use chrono::NaiveDate;
    use reqwest::Client;
    use std::time::Duration;
    use url::Url;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn clock() -> SimulatedClock {
        SimulatedClock::new(
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        )
    }

    fn coordinator(
        server: &MockServer,
        checkpoint: MemoryCheckpoint,
        max_keys: Option<u64>,
    ) -> Coordinator<SqliteStorage, MemoryCheckpoint, SimulatedClock> {
        let storage = SqliteStorage::new_in_memory().unwrap();
        coordinator_with(server, storage, checkpoint, max_keys, clock())
    }

    fn coordinator_with<S: Storage>(
        server: &MockServer,
        storage: S,
        checkpoint: MemoryCheckpoint,
        max_keys: Option<u64>,
        clock: SimulatedClock,
    ) -> Coordinator<S, MemoryCheckpoint, SimulatedClock> {
        let gate = QuotaGate::new(clock.clone(), 1000, Duration::ZERO);
        let fetcher = PagedFetcher::new(
            Client::new(),
            Url::parse(&server.uri()).unwrap(),
            "TESTKEY".to_string(),
            10,
            RetryPolicy::linear(3, Duration::from_secs(5)),
            gate,
            clock.clone(),
        );
        let settings = CrawlSettings {
            consonants: vec![Consonant::Giyeok],
            max_keys,
            storage_retry: RetryPolicy::fixed(3, Duration::from_secs(1)),
            config_hash: "test".to_string(),
        };
        Coordinator::new(
            storage,
            checkpoint,
            fetcher,
            clock,
            settings,
        )
    }

    /// Store whose inserts of one word always fail with a busy database
    struct RefusesWord {
        inner: SqliteStorage,
        word: &'static str,
        reconnects: u32,
    }

    impl DictionaryStore for RefusesWord {
        fn insert(&mut self, word: &NormalizedWord) -> StorageResult<InsertOutcome> {
            if word.word == self.word {
                return Err(StorageError::Sqlite(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                    None,
                )));
            }
            self.inner.insert(word)
        }

        fn contains(&self, consonant: Consonant, word: &str) -> StorageResult<bool> {
            self.inner.contains(consonant, word)
        }

        fn reconnect(&mut self) -> StorageResult<()> {
            self.reconnects += 1;
            Ok(())
        }

        fn count_words(&self, consonant: Consonant) -> StorageResult<u64> {
            self.inner.count_words(consonant)
        }
    }

    impl Storage for RefusesWord {
        fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
            self.inner.create_run(kind, config_hash)
        }

        fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
            self.inner.get_run(run_id)
        }

        fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
            self.inner.get_latest_run()
        }

        fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
            self.inner.finish_run(run_id, status)
        }

        fn words_in(&self, consonant: Consonant) -> StorageResult<Vec<String>> {
            self.inner.words_in(consonant)
        }

        fn insert_winning_word(
            &mut self,
            word: &str,
            last_char: char,
        ) -> StorageResult<InsertOutcome> {
            self.inner.insert_winning_word(word, last_char)
        }

        fn count_winning_words(&self) -> StorageResult<u64> {
            self.inner.count_winning_words()
        }
    }

    #[tokio::test]
    async fn test_key_limit_stops_cleanly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "가"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "channel": {"total": 2, "item": [
                    {"word": "가게", "sense": {"definition": "물건을 파는 집."}},
                    {"word": "가", "sense": {"definition": "끝."}}
                ]}
            })))
            .mount(&server)
            .await;

        let mut coordinator = coordinator(&server, MemoryCheckpoint::new(), Some(1));
        let report = coordinator.run().await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::KeyLimitReached);
        assert_eq!(report.summary.keys_completed, 1);
        assert_eq!(report.summary.words_inserted, 1);
        assert_eq!(report.summary.rejected, 1);
        assert_eq!(coordinator.phase(), CrawlPhase::Done);

        let saved = coordinator.checkpoint().history();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].syllable_index, 1);
        assert_eq!(saved[0].page_cursor, 1);

        let run = coordinator.storage().get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_exhausted_checkpoint_is_done_immediately() {
        let server = MockServer::start().await;
        let exhausted = CrawlProgress {
            consonant_index: Consonant::COUNT,
            syllable_index: 0,
            page_cursor: 1,
        };

        let mut coordinator = coordinator(&server, MemoryCheckpoint::starting_at(exhausted), None);
        let report = coordinator.run().await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::Completed);
        assert_eq!(report.summary, CrawlSummary::default());
        assert!(coordinator.checkpoint().history().is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_before_first_fetch() {
        let server = MockServer::start().await;

        let mut coordinator = coordinator(&server, MemoryCheckpoint::new(), None);
        let report = coordinator.run_until(std::future::ready(())).await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::Interrupted);
        assert_eq!(report.checkpoint, CrawlProgress::origin());
        assert_eq!(coordinator.phase(), CrawlPhase::Aborted);

        let run = coordinator.storage().get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Interrupted);
    }

    #[tokio::test]
    async fn test_failed_insert_skips_word_and_advances() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "가"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "channel": {"total": 3, "item": [
                    {"word": "가게", "sense": {"definition": "물건을 파는 집."}},
                    {"word": "가방", "sense": {"definition": "물건을 넣는 용구."}},
                    {"word": "가위", "sense": {"definition": "자르는 도구."}}
                ]}
            })))
            .mount(&server)
            .await;

        let storage = RefusesWord {
            inner: SqliteStorage::new_in_memory().unwrap(),
            word: "가방",
            reconnects: 0,
        };
        let clock = clock();
        let mut coordinator =
            coordinator_with(&server, storage, MemoryCheckpoint::new(), Some(1), clock.clone());
        let report = coordinator.run().await.unwrap();

        assert_eq!(report.outcome, CrawlOutcome::KeyLimitReached);
        assert_eq!(report.summary.storage_failures, 1);
        assert_eq!(report.summary.words_inserted, 2);
        assert_eq!(report.summary.keys_completed, 1);

        let storage = coordinator.storage();
        assert!(storage.contains(Consonant::Giyeok, "가게").unwrap());
        assert!(storage.contains(Consonant::Giyeok, "가위").unwrap());
        assert!(!storage.contains(Consonant::Giyeok, "가방").unwrap());
        // two reconnects before giving up on the third attempt
        assert_eq!(storage.reconnects, 2);
        assert_eq!(clock.total_slept(), Duration::from_secs(2));

        let saved = coordinator.checkpoint().history();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].consonant_index, 0);
        assert_eq!(saved[0].syllable_index, 1);
        assert_eq!(saved[0].page_cursor, 1);
    }
}
