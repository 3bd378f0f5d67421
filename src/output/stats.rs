//! Statistics generation from the dictionary database
//!
//! This module provides functionality for extracting and displaying
//! dictionary statistics from the storage layer.

use crate::hangul::{Consonant, Keyspace};
use crate::state::CrawlProgress;
use crate::storage::{RunRecord, Storage};
use crate::Result;

/// Dictionary statistics summary
#[derive(Debug, Clone)]
pub struct DictionaryStatistics {
    /// Word count per consonant partition, in composition order
    pub partitions: Vec<(Consonant, u64)>,

    /// Total words across all partitions
    pub total_words: u64,

    /// Number of stored winning words
    pub winning_words: u64,

    /// Most recent run of any kind
    pub latest_run: Option<RunRecord>,

    /// Saved crawl position, if a checkpoint exists
    pub checkpoint: Option<CrawlProgress>,
}

impl DictionaryStatistics {
    /// Keys left to crawl from the checkpoint over the full key-space
    pub fn keys_remaining(&self) -> usize {
        let progress = self.checkpoint.unwrap_or_default();
        Keyspace::new()
            .starting_at(progress.consonant_index, progress.syllable_index)
            .remaining()
    }
}

/// Loads statistics from storage
pub fn load_statistics(
    storage: &dyn Storage,
    checkpoint: Option<CrawlProgress>,
) -> Result<DictionaryStatistics> {
    let mut partitions = Vec::with_capacity(Consonant::COUNT);
    for consonant in Consonant::ALL {
        partitions.push((consonant, storage.count_words(consonant)?));
    }
    let total_words: u64 = partitions.iter().map(|(_, count)| count).sum();

    Ok(DictionaryStatistics {
        partitions,
        total_words,
        winning_words: storage.count_winning_words()?,
        latest_run: storage.get_latest_run()?,
        checkpoint,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &DictionaryStatistics) {
    println!("=== Dictionary Statistics ===\n");

    println!("Words by Initial Consonant:");
    for (consonant, count) in &stats.partitions {
        let percentage = if stats.total_words > 0 {
            (*count as f64 / stats.total_words as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  {} ({:<7}) {:>8} ({:.1}%)",
            consonant,
            consonant.partition(),
            count,
            percentage
        );
    }
    println!();

    println!("Overview:");
    println!("  Total words: {}", stats.total_words);
    println!("  Winning words: {}", stats.winning_words);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run:");
            println!("  #{} {} ({})", run.id, run.kind.to_db_string(), run.status.to_db_string());
            println!("  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                println!("  Finished: {}", finished);
            }
        }
        None => println!("No runs recorded yet"),
    }
    println!();

    match stats.checkpoint {
        Some(progress) => {
            println!("Checkpoint: {}", progress);
            println!("  Keys remaining: {}", stats.keys_remaining());
        }
        None => println!("Checkpoint: none (next crawl starts at 가)"),
    }
}
