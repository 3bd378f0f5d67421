//! Winning-word finder
//!
//! In a word-chain game a word ending in a syllable that starts no dictionary
//! word cannot be answered. This pass scans the stored dictionary once and
//! records those words in the `winning_words` table.

use crate::hangul::{all_syllables, Consonant};
use crate::storage::{InsertOutcome, Storage};
use crate::Result;
use std::collections::{HashMap, HashSet};

const PROGRESS_EVERY: usize = 1000;

/// Counts from one winning-word pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinningReport {
    /// Words loaded from the partitions
    pub words_scanned: u64,

    pub syllables_checked: u64,

    /// Syllables no stored word starts with
    pub dead_ends: u64,

    pub inserted: u64,
    pub duplicates: u64,
}

/// Finds and stores every winning word
///
/// A syllable that starts no stored word is a dead end; every stored word
/// ending in a dead end is a winning word. Existing entries are kept.
pub fn find_winning_words<S: Storage + ?Sized>(storage: &mut S) -> Result<WinningReport> {
    let mut report = WinningReport::default();
    let mut starts = HashSet::new();
    let mut by_last: HashMap<char, Vec<String>> = HashMap::new();

    for consonant in Consonant::ALL {
        for word in storage.words_in(consonant)? {
            report.words_scanned += 1;
            if let Some(first) = word.chars().next() {
                starts.insert(first);
            }
            if let Some(last) = word.chars().last() {
                by_last.entry(last).or_default().push(word);
            }
        }
    }
    tracing::info!(
        words = report.words_scanned,
        "Loaded dictionary, scanning syllables"
    );

    for syllable in all_syllables() {
        report.syllables_checked += 1;
        if report.syllables_checked as usize % PROGRESS_EVERY == 0 {
            tracing::info!(
                checked = report.syllables_checked,
                current = %syllable,
                dead_ends = report.dead_ends,
                "Winning-word progress"
            );
        }

        if starts.contains(&syllable) {
            continue;
        }
        report.dead_ends += 1;

        let Some(words) = by_last.get(&syllable) else {
            continue;
        };
        for word in words {
            match storage.insert_winning_word(word, syllable)? {
                InsertOutcome::Inserted => {
                    tracing::debug!(word = %word, last_char = %syllable, "Found winning word");
                    report.inserted += 1;
                }
                InsertOutcome::Duplicate => report.duplicates += 1,
            }
        }
    }

    tracing::info!(
        dead_ends = report.dead_ends,
        inserted = report.inserted,
        duplicates = report.duplicates,
        "Winning-word pass finished"
    );
    Ok(report)
}
