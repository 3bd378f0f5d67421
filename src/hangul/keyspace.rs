//! The crawl key-space
//!
//! Keys are single syllables, ordered by initial consonant, then vowel, then final.
//! The enumeration is restartable from any `(consonant_index, syllable_index)`
//! offset, which is exactly what a checkpoint records.

use super::{compose, Consonant, FINAL_COUNT, SYLLABLES_PER_CONSONANT};

/// A single search key in the crawl order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchKey {
    /// Initial consonant shared by every syllable of this group
    pub consonant: Consonant,

    /// Position of the syllable within its consonant group (0..588)
    pub syllable_index: usize,

    /// The syllable sent as the query
    pub syllable: char,
}

impl SearchKey {
    /// Composition index of the consonant (0..19)
    pub fn consonant_index(&self) -> usize {
        self.consonant.index()
    }

    /// The query string for this key
    pub fn query(&self) -> String {
        self.syllable.to_string()
    }
}

/// Lazy, finite iterator over search keys
///
/// # Example
///
/// ```
/// use hangul_harvest::hangul::Keyspace;
///
/// let mut keys = Keyspace::new();
/// assert_eq!(keys.next().map(|k| k.syllable), Some('가'));
/// assert_eq!(keys.next().map(|k| k.syllable), Some('각'));
/// ```
#[derive(Debug, Clone)]
pub struct Keyspace {
    /// Which consonant groups are enumerated
    enabled: [bool; Consonant::COUNT],

    /// Next consonant group to yield from
    consonant_index: usize,

    /// Next syllable within the current group
    syllable_index: usize,
}

impl Keyspace {
    /// Enumerates every syllable of every consonant (11172 keys)
    pub fn new() -> Self {
        Self {
            enabled: [true; Consonant::COUNT],
            consonant_index: 0,
            syllable_index: 0,
        }
    }

    /// Enumerates only the given consonant groups, still in composition order
    ///
    /// An empty selection enumerates nothing.
    pub fn with_consonants<I>(consonants: I) -> Self
    where
        I: IntoIterator<Item = Consonant>,
    {
        let mut enabled = [false; Consonant::COUNT];
        for consonant in consonants {
            enabled[consonant.index()] = true;
        }
        Self {
            enabled,
            consonant_index: 0,
            syllable_index: 0,
        }
    }

    /// Skips everything before the given offset
    pub fn starting_at(mut self, consonant_index: usize, syllable_index: usize) -> Self {
        self.consonant_index = consonant_index;
        self.syllable_index = syllable_index;
        self
    }

    /// Number of keys this enumeration yields from its current position
    pub fn remaining(&self) -> usize {
        self.clone().count()
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Keyspace {
    type Item = SearchKey;

    fn next(&mut self) -> Option<SearchKey> {
        loop {
            let consonant = Consonant::from_index(self.consonant_index)?;

            if !self.enabled[self.consonant_index] || self.syllable_index >= SYLLABLES_PER_CONSONANT
            {
                self.consonant_index += 1;
                self.syllable_index = 0;
                continue;
            }

            let syllable_index = self.syllable_index;
            self.syllable_index += 1;

            let syllable = compose(
                self.consonant_index,
                syllable_index / FINAL_COUNT,
                syllable_index % FINAL_COUNT,
            )?;

            return Some(SearchKey {
                consonant,
                syllable_index,
                syllable,
            });
        }
    }
}
