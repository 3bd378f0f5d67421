//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::hangul::{Consonant, NormalizedWord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DictionaryStore, InsertOutcome, Storage, StorageError, StorageResult};
use crate::storage::{RunKind, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::{Path, PathBuf};

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,

    /// Database file, or None for an in-memory database
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and provisions the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Creates an in-memory database
    ///
    /// `reconnect` is a no-op here since reopening would lose the data.
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn open_connection(path: &Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
        PRAGMA busy_timeout = 5000;
    ",
    )?;

    initialize_schema(&conn)?;
    Ok(conn)
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        kind: RunKind::from_db_string(&row.get::<_, String>(1)?).unwrap_or(RunKind::Crawl),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
            .unwrap_or(RunStatus::Running),
    })
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

impl DictionaryStore for SqliteStorage {
    fn insert(&mut self, word: &NormalizedWord) -> StorageResult<InsertOutcome> {
        if self.contains(word.consonant, &word.word)? {
            return Ok(InsertOutcome::Duplicate);
        }

        let sql = format!(
            "INSERT INTO {} (word, definition) VALUES (?1, ?2)",
            word.consonant.partition()
        );
        let result = self
            .conn
            .prepare_cached(&sql)?
            .execute(params![word.word, word.definition]);

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            // Lost a race with another writer between check and insert
            Err(e) if is_constraint_violation(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, consonant: Consonant, word: &str) -> StorageResult<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE word = ?1", consonant.partition());
        let found: Option<i64> = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params![word], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn reconnect(&mut self) -> StorageResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        tracing::info!(path = %path.display(), "Reopening database connection");
        self.conn = open_connection(&path)?;
        Ok(())
    }

    fn count_words(&self, consonant: Consonant) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", consonant.partition());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, kind, started_at, finished_at, config_hash, status
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, kind, started_at, finished_at, config_hash, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Dictionary Scans =====

    fn words_in(&self, consonant: Consonant) -> StorageResult<Vec<String>> {
        let sql = format!("SELECT word FROM {} ORDER BY id", consonant.partition());
        let mut stmt = self.conn.prepare(&sql)?;
        let words = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(words)
    }

    // ===== Winning Words =====

    fn insert_winning_word(&mut self, word: &str, last_char: char) -> StorageResult<InsertOutcome> {
        let inserted = self
            .conn
            .prepare_cached(
                "INSERT OR IGNORE INTO winning_words (word, last_char) VALUES (?1, ?2)",
            )?
            .execute(params![word, last_char.to_string()])?;

        Ok(if inserted == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }

    fn count_winning_words(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM winning_words", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
