//! Hangul syllable arithmetic, the crawl key-space, and word normalization
//!
//! Everything here is pure: no network, storage, or clock access.
//!
//! # Components
//!
//! - `Consonant`: the 19 syllable-initial consonants and their dictionary partitions
//! - `Keyspace`: the ordered, restartable sequence of search keys
//! - `normalize`: cleanup and validation of raw dictionary entries

mod consonant;
mod keyspace;
mod normalize;

pub use consonant::Consonant;
pub use keyspace::{Keyspace, SearchKey};
pub use normalize::{
    clean_definition, clean_word, is_hangul, normalize, normalize_entry, NormalizedWord,
    RawResult, Rejection,
};

/// First precomposed syllable, U+AC00 (가)
pub const SYLLABLE_BASE: u32 = 0xAC00;

/// Last precomposed syllable, U+D7A3 (힣)
pub const SYLLABLE_LAST: u32 = 0xD7A3;

/// Number of medial vowels
pub const VOWEL_COUNT: usize = 21;

/// Number of final consonants, including "no final"
pub const FINAL_COUNT: usize = 28;

/// Syllables sharing one initial consonant
pub const SYLLABLES_PER_CONSONANT: usize = VOWEL_COUNT * FINAL_COUNT;

/// Composes a syllable from its initial, vowel, and final indices
///
/// Returns `None` if any index is out of range.
pub fn compose(consonant_index: usize, vowel_index: usize, final_index: usize) -> Option<char> {
    if consonant_index >= Consonant::COUNT
        || vowel_index >= VOWEL_COUNT
        || final_index >= FINAL_COUNT
    {
        return None;
    }
    let offset = (consonant_index * VOWEL_COUNT + vowel_index) * FINAL_COUNT + final_index;
    char::from_u32(SYLLABLE_BASE + offset as u32)
}

/// Returns true if `c` is a precomposed Hangul syllable
pub fn is_syllable(c: char) -> bool {
    (SYLLABLE_BASE..=SYLLABLE_LAST).contains(&(c as u32))
}

/// Iterates every precomposed syllable from 가 to 힣
pub fn all_syllables() -> impl Iterator<Item = char> {
    (SYLLABLE_BASE..=SYLLABLE_LAST).filter_map(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_bounds() {
        assert_eq!(compose(0, 0, 0), Some('가'));
        assert_eq!(compose(0, 0, 1), Some('각'));
        assert_eq!(compose(18, 20, 27), Some('힣'));
        assert_eq!(compose(19, 0, 0), None);
        assert_eq!(compose(0, 21, 0), None);
        assert_eq!(compose(0, 0, 28), None);
    }

    #[test]
    fn test_all_syllables_count() {
        assert_eq!(all_syllables().count(), Consonant::COUNT * SYLLABLES_PER_CONSONANT);
        assert!(all_syllables().all(is_syllable));
    }
}
