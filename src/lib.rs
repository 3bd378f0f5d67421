//! Hangul-Harvest: a resumable, quota-aware Korean dictionary crawler
//!
//! This crate walks every Hangul syllable grouped by initial consonant, queries a
//! rate-limited dictionary search API page by page, normalizes the results, and
//! stores them in 19 consonant partitions. Progress is checkpointed after every
//! committed page so a multi-day crawl survives restarts and quota exhaustion.
//!
//! The same normalizer and store back the CSV bulk import and the winning-word
//! finder used by word-chain games.

pub mod clock;
pub mod config;
pub mod crawler;
pub mod hangul;
pub mod import;
pub mod output;
pub mod retry;
pub mod state;
pub mod storage;
pub mod winning;

use thiserror::Error;

/// Main error type for Hangul-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] state::CheckpointError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Invalid crawl phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid consonant in config: {0}")]
    InvalidConsonant(String),

    #[error("Missing API credential: {0}")]
    MissingCredential(String),
}

/// Result type alias for Hangul-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use hangul::{normalize, Consonant, Keyspace, NormalizedWord, RawResult, Rejection, SearchKey};
pub use state::{CrawlPhase, CrawlProgress};
