//! Word normalization
//!
//! Turns raw dictionary entries (from the search API or a CSV export) into
//! canonical word/definition pairs, or rejects them. Rejection is ordinary,
//! high-frequency behavior and is returned as a value, never as an error.

use super::{is_syllable, Consonant};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// One headword with its definitions, as returned by a single API page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResult {
    pub word: String,
    pub definitions: Vec<String>,
}

impl RawResult {
    pub fn new(word: impl Into<String>, definitions: Vec<String>) -> Self {
        Self {
            word: word.into(),
            definitions,
        }
    }
}

/// A cleaned word ready for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedWord {
    /// Cleaned headword: at least two characters, Hangul only
    pub word: String,

    /// Cleaned definition (may be empty if the source had none)
    pub definition: String,

    /// Partition key, taken from the first character
    pub consonant: Consonant,
}

/// Why a raw entry was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing left after cleaning
    Empty,

    /// A single character is not a playable word
    TooShort,

    /// Contains a character outside the Hangul syllable and jamo blocks
    NonHangul(char),

    /// First character has no initial consonant (e.g. a bare jamo)
    NoInitialConsonant(char),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty after cleaning"),
            Self::TooShort => write!(f, "too short"),
            Self::NonHangul(c) => write!(f, "non-Hangul character {:?}", c),
            Self::NoInitialConsonant(c) => write!(f, "no initial consonant for {:?}", c),
        }
    }
}

/// Returns true for Hangul syllables (U+AC00–U+D7A3) and conjoining jamo (U+1100–U+11FF)
pub fn is_hangul(c: char) -> bool {
    is_syllable(c) || ('\u{1100}'..='\u{11FF}').contains(&c)
}

/// Cleans a headword
///
/// Trims, drops `-` and `^` markers, and removes internal whitespace.
pub fn clean_word(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '^' && !c.is_whitespace())
        .collect()
}

fn sense_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"「\d+」\s*").expect("sense marker regex is valid"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

/// Cleans a definition
///
/// Strips `「N」` sense numbering and collapses whitespace runs (including
/// newlines) to single spaces.
pub fn clean_definition(raw: &str) -> String {
    let without_markers = sense_marker().replace_all(raw, "");
    whitespace_run()
        .replace_all(&without_markers, " ")
        .trim()
        .to_string()
}

/// Normalizes a single word/definition pair
pub fn normalize_entry(word: &str, definition: &str) -> Result<NormalizedWord, Rejection> {
    let word = clean_word(word);

    let first = word.chars().next().ok_or(Rejection::Empty)?;
    if word.chars().count() <= 1 {
        return Err(Rejection::TooShort);
    }
    if let Some(bad) = word.chars().find(|c| !is_hangul(*c)) {
        return Err(Rejection::NonHangul(bad));
    }
    let consonant = Consonant::of_syllable(first).ok_or(Rejection::NoInitialConsonant(first))?;

    Ok(NormalizedWord {
        word,
        definition: clean_definition(definition),
        consonant,
    })
}

/// Normalizes an API result
///
/// The first definition that is non-empty after cleaning is kept, since each
/// word is stored once per partition.
pub fn normalize(raw: &RawResult) -> Result<NormalizedWord, Rejection> {
    let definition = raw
        .definitions
        .iter()
        .map(|d| clean_definition(d))
        .find(|d| !d.is_empty())
        .unwrap_or_default();

    let mut normalized = normalize_entry(&raw.word, "")?;
    normalized.definition = definition;
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(word: &str, definition: &str) -> RawResult {
        RawResult::new(word, vec![definition.to_string()])
    }

    #[test]
    fn test_accepts_plain_word() {
        let word = normalize(&raw("가정", "한 가족이 살림하는 집.")).unwrap();
        assert_eq!(word.word, "가정");
        assert_eq!(word.definition, "한 가족이 살림하는 집.");
        assert_eq!(word.consonant, Consonant::Giyeok);
    }

    #[test]
    fn test_strips_hyphen_and_caret() {
        assert_eq!(normalize(&raw("사랑-하다", "")).unwrap().word, "사랑하다");
        assert_eq!(normalize(&raw("물^고기", "")).unwrap().word, "물고기");
        assert_eq!(normalize(&raw("  나무 그늘 ", "")).unwrap().word, "나무그늘");
    }

    #[test]
    fn test_cleans_definition_markers() {
        assert_eq!(clean_definition("「1」 뜻풀이\n설명"), "뜻풀이 설명");
        assert_eq!(
            clean_definition("「1」첫째 뜻. 「12」  둘째\t\t뜻."),
            "첫째 뜻. 둘째 뜻."
        );
        assert_eq!(clean_definition("   "), "");
    }

    #[test]
    fn test_rejects_single_character() {
        assert_eq!(normalize(&raw("가", "")), Err(Rejection::TooShort));
        assert_eq!(normalize(&raw("-가^", "")), Err(Rejection::TooShort));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(normalize(&raw("  -  ", "")), Err(Rejection::Empty));
    }

    #[test]
    fn test_rejects_digits_and_parentheses() {
        assert_eq!(normalize(&raw("가정1", "")), Err(Rejection::NonHangul('1')));
        assert_eq!(normalize(&raw("가(01)", "")), Err(Rejection::NonHangul('(')));
    }

    #[test]
    fn test_rejects_non_hangul() {
        assert_eq!(normalize(&raw("가a", "")), Err(Rejection::NonHangul('a')));
        assert_eq!(normalize(&raw("家庭", "")), Err(Rejection::NonHangul('家')));
        assert!(matches!(
            normalize(&raw("ㄱㄴ", "")),
            Err(Rejection::NonHangul(_))
        ));
    }

    #[test]
    fn test_rejects_leading_jamo() {
        // Conjoining jamo are Hangul but carry no precomposed initial
        assert_eq!(
            normalize(&raw("\u{1100}\u{1161}", "")),
            Err(Rejection::NoInitialConsonant('\u{1100}'))
        );
    }

    #[test]
    fn test_first_non_empty_definition_wins() {
        let result = RawResult::new(
            "가게",
            vec!["「1」  ".to_string(), "「2」 물건을 파는 집.".to_string()],
        );
        assert_eq!(normalize(&result).unwrap().definition, "물건을 파는 집.");
    }

    #[test]
    fn test_missing_definitions_are_empty() {
        let result = RawResult::new("가게", Vec::new());
        assert_eq!(normalize(&result).unwrap().definition, "");
    }
}
