//! Output module for reports on the stored dictionary
//!
//! This module handles:
//! - Collecting per-partition and run statistics
//! - Printing them for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, DictionaryStatistics};
