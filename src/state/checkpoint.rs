//! Durable crawl checkpoints
//!
//! The checkpoint is a tiny JSON document rewritten after every committed page.
//! Writes go to a temporary file in the same directory which is synced and then
//! renamed over the old checkpoint, so `load` never observes a partial write.

use crate::state::CrawlProgress;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors that can occur while reading or writing a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Checkpoint {path} is unreadable: {source}")]
    Corrupt {
        path: String,
        source: serde_json::Error,
    },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialization(serde_json::Error),

    #[error("Failed to replace checkpoint: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("Refusing to move checkpoint backwards: {saved} -> {attempted}")]
    Regression {
        saved: CrawlProgress,
        attempted: CrawlProgress,
    },
}

/// Trait for checkpoint backends
///
/// The crawl driver is the single writer. `save` must be durable when it
/// returns.
pub trait CheckpointStore {
    /// Reads the resume point, or the origin if none was ever saved
    fn load(&mut self) -> Result<CrawlProgress, CheckpointError>;

    /// Persists a new resume point
    ///
    /// A position earlier than the last loaded or saved one is rejected.
    fn save(&mut self, progress: &CrawlProgress) -> Result<(), CheckpointError>;

    /// Discards any saved position
    fn reset(&mut self) -> Result<(), CheckpointError>;

    /// The last position loaded or saved through this handle
    fn last_saved(&self) -> Option<CrawlProgress>;
}

fn check_monotonic(
    last: Option<CrawlProgress>,
    attempted: &CrawlProgress,
) -> Result<(), CheckpointError> {
    match last {
        Some(saved) if *attempted < saved => Err(CheckpointError::Regression {
            saved,
            attempted: *attempted,
        }),
        _ => Ok(()),
    }
}

/// JSON file checkpoint with atomic replace
#[derive(Debug)]
pub struct FileCheckpoint {
    path: PathBuf,
    last_saved: Option<CrawlProgress>,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_saved: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the checkpoint without taking ownership of the position
    ///
    /// Used by read-only commands such as `--stats`.
    pub fn peek(&self) -> Result<Option<CrawlProgress>, CheckpointError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CheckpointError::Corrupt {
                path: self.path.display().to_string(),
                source,
            })
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl CheckpointStore for FileCheckpoint {
    fn load(&mut self) -> Result<CrawlProgress, CheckpointError> {
        let progress = self.peek()?.unwrap_or_else(CrawlProgress::origin);
        self.last_saved = Some(progress);
        Ok(progress)
    }

    fn save(&mut self, progress: &CrawlProgress) -> Result<(), CheckpointError> {
        check_monotonic(self.last_saved, progress)?;

        let directory = self.directory().to_path_buf();
        fs::create_dir_all(&directory)?;

        let mut temp = NamedTempFile::new_in(&directory)?;
        serde_json::to_writer(&mut temp, progress).map_err(CheckpointError::Serialization)?;
        temp.flush()?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        self.last_saved = Some(*progress);
        tracing::debug!(%progress, path = %self.path.display(), "Checkpoint saved");
        Ok(())
    }

    fn reset(&mut self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.last_saved = None;
        tracing::info!(path = %self.path.display(), "Checkpoint reset");
        Ok(())
    }

    fn last_saved(&self) -> Option<CrawlProgress> {
        self.last_saved
    }
}

/// In-memory checkpoint that keeps every saved position
///
/// Useful for dry runs and for asserting on the exact save sequence.
#[derive(Debug, Default, Clone)]
pub struct MemoryCheckpoint {
    current: Option<CrawlProgress>,
    history: Vec<CrawlProgress>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing position, as if it had been saved by a prior run
    pub fn starting_at(progress: CrawlProgress) -> Self {
        Self {
            current: Some(progress),
            history: Vec::new(),
        }
    }

    /// Every position saved through this handle, in order
    pub fn history(&self) -> &[CrawlProgress] {
        &self.history
    }
}

impl CheckpointStore for MemoryCheckpoint {
    fn load(&mut self) -> Result<CrawlProgress, CheckpointError> {
        let progress = self.current.unwrap_or_else(CrawlProgress::origin);
        self.current = Some(progress);
        Ok(progress)
    }

    fn save(&mut self, progress: &CrawlProgress) -> Result<(), CheckpointError> {
        check_monotonic(self.current, progress)?;
        self.current = Some(*progress);
        self.history.push(*progress);
        Ok(())
    }

    fn reset(&mut self) -> Result<(), CheckpointError> {
        self.current = None;
        Ok(())
    }

    fn last_saved(&self) -> Option<CrawlProgress> {
        self.current
    }
}
