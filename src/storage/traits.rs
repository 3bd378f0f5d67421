//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::hangul::{Consonant, NormalizedWord};
use crate::storage::{RunKind, RunRecord, RunStatus};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true for failures a reconnect may cure
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::CannotOpen
                    | ErrorCode::SystemIoFailure
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an idempotent insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Deduplicated word store partitioned by initial consonant
///
/// This is all the crawler and the CSV importer need.
pub trait DictionaryStore {
    /// Inserts a word into its consonant partition
    ///
    /// A word already present in the partition is reported as `Duplicate` and
    /// leaves the stored row untouched.
    fn insert(&mut self, word: &NormalizedWord) -> StorageResult<InsertOutcome>;

    /// Checks whether a word exists in a partition
    fn contains(&self, consonant: Consonant, word: &str) -> StorageResult<bool>;

    /// Re-establishes the underlying connection
    fn reconnect(&mut self) -> StorageResult<()>;

    /// Counts the words in one partition
    fn count_words(&self, consonant: Consonant) -> StorageResult<u64>;
}

/// Trait for storage backend implementations
///
/// Extends `DictionaryStore` with run bookkeeping and the scans used by the
/// winning-word finder and the statistics report.
pub trait Storage: DictionaryStore {
    // ===== Run Management =====

    /// Creates a new run in the `running` state
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run of any kind
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Sets the final status of a run and stamps its finish time
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Dictionary Scans =====

    /// Every word stored in one partition, in storage order
    fn words_in(&self, consonant: Consonant) -> StorageResult<Vec<String>>;

    // ===== Winning Words =====

    /// Records a winning word; existing entries are left alone
    fn insert_winning_word(&mut self, word: &str, last_char: char) -> StorageResult<InsertOutcome>;

    /// Counts stored winning words
    fn count_winning_words(&self) -> StorageResult<u64>;

    // ===== Statistics =====

    /// Total words across all partitions
    fn count_all_words(&self) -> StorageResult<u64> {
        Consonant::ALL
            .into_iter()
            .map(|c| self.count_words(c))
            .sum()
    }
}
