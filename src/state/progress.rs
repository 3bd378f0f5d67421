/// Crawl position definitions
///
/// A `CrawlProgress` names the next unit of work, never the last one attempted.
use crate::hangul::{Consonant, SearchKey, SYLLABLES_PER_CONSONANT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resume point of a crawl
///
/// Ordering is lexicographic over (consonant, syllable, page), which is also
/// the crawl order, so a later position always compares greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CrawlProgress {
    /// Consonant group of the next key (19 means the key-space is exhausted)
    pub consonant_index: usize,

    /// Syllable within the group of the next key
    pub syllable_index: usize,

    /// Next page of that key to request (1-based)
    pub page_cursor: u32,
}

impl CrawlProgress {
    /// The very first page of the very first key
    pub fn origin() -> Self {
        Self {
            consonant_index: 0,
            syllable_index: 0,
            page_cursor: 1,
        }
    }

    /// Resume at a given page of a key
    pub fn at_page(key: &SearchKey, page: u32) -> Self {
        Self {
            consonant_index: key.consonant_index(),
            syllable_index: key.syllable_index,
            page_cursor: page,
        }
    }

    /// Resume at the key immediately after `key`
    ///
    /// Rolls over to the next consonant group after the last syllable.
    pub fn after_key(key: &SearchKey) -> Self {
        let next_syllable = key.syllable_index + 1;
        if next_syllable >= SYLLABLES_PER_CONSONANT {
            Self {
                consonant_index: key.consonant_index() + 1,
                syllable_index: 0,
                page_cursor: 1,
            }
        } else {
            Self {
                consonant_index: key.consonant_index(),
                syllable_index: next_syllable,
                page_cursor: 1,
            }
        }
    }

    /// First page to request for `key` when resuming from this position
    ///
    /// Only the key the checkpoint points into resumes mid-way.
    pub fn start_page_for(&self, key: &SearchKey) -> u32 {
        if key.consonant_index() == self.consonant_index
            && key.syllable_index == self.syllable_index
        {
            self.page_cursor.max(1)
        } else {
            1
        }
    }

    /// True once every consonant group has been crawled
    pub fn is_exhausted(&self) -> bool {
        self.consonant_index >= Consonant::COUNT
    }
}

impl Default for CrawlProgress {
    fn default() -> Self {
        Self::origin()
    }
}

impl fmt::Display for CrawlProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Consonant::from_index(self.consonant_index) {
            Some(consonant) => write!(
                f,
                "consonant {} ({}), syllable {}, page {}",
                consonant, self.consonant_index, self.syllable_index, self.page_cursor
            ),
            None => write!(f, "end of key-space"),
        }
    }
}
