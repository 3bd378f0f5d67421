//! Storage module for persisting the dictionary
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent word inserts into the 19 consonant partitions
//! - Reconnect-and-retry for transient storage failures
//! - Run tracking and the winning-word table

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::SqliteStorage;
pub use traits::{DictionaryStore, InsertOutcome, Storage, StorageError, StorageResult};

use crate::clock::Clock;
use crate::hangul::NormalizedWord;
use crate::retry::{RetryFailure, RetryPolicy};
use std::future::ready;

/// Inserts a word, reconnecting and retrying on transient failures
///
/// Every attempt after the first reconnects before inserting. The caller
/// decides what a final failure means; the crawl logs it and moves on.
pub async fn insert_with_retry<S, C>(
    store: &mut S,
    word: &NormalizedWord,
    policy: &RetryPolicy,
    clock: &C,
) -> Result<InsertOutcome, RetryFailure<StorageError>>
where
    S: DictionaryStore + ?Sized,
    C: Clock,
{
    policy
        .run(
            clock,
            "store word",
            |attempt| {
                if attempt > 1 {
                    if let Err(e) = store.reconnect() {
                        return ready(Err(e));
                    }
                }
                ready(store.insert(word))
            },
            StorageError::is_transient,
        )
        .await
}

/// Represents a run in the database
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub kind: RunKind,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// What a run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Crawl,
    Import,
    WinningWords,
}

impl RunKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Import => "import",
            Self::WinningWords => "winning_words",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "crawl" => Some(Self::Crawl),
            "import" => Some(Self::Import),
            "winning_words" => Some(Self::WinningWords),
            _ => None,
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
