/// Syllable-initial consonants and their dictionary partitions
///
/// Each consonant owns one storage partition so uniqueness checks stay local to it.
use std::fmt;

use super::{SYLLABLE_BASE, SYLLABLE_LAST};

/// One of the 19 initial consonants, in Unicode composition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Consonant {
    /// ㄱ
    Giyeok,
    /// ㄲ
    SsangGiyeok,
    /// ㄴ
    Nieun,
    /// ㄷ
    Digeut,
    /// ㄸ
    SsangDigeut,
    /// ㄹ
    Rieul,
    /// ㅁ
    Mieum,
    /// ㅂ
    Bieup,
    /// ㅃ
    SsangBieup,
    /// ㅅ
    Siot,
    /// ㅆ
    SsangSiot,
    /// ㅇ
    Ieung,
    /// ㅈ
    Jieut,
    /// ㅉ
    SsangJieut,
    /// ㅊ
    Chieut,
    /// ㅋ
    Kieuk,
    /// ㅌ
    Tieut,
    /// ㅍ
    Pieup,
    /// ㅎ
    Hieut,
}

impl Consonant {
    /// Number of initial consonants
    pub const COUNT: usize = 19;

    /// All consonants in composition order
    pub const ALL: [Consonant; Consonant::COUNT] = [
        Self::Giyeok,
        Self::SsangGiyeok,
        Self::Nieun,
        Self::Digeut,
        Self::SsangDigeut,
        Self::Rieul,
        Self::Mieum,
        Self::Bieup,
        Self::SsangBieup,
        Self::Siot,
        Self::SsangSiot,
        Self::Ieung,
        Self::Jieut,
        Self::SsangJieut,
        Self::Chieut,
        Self::Kieuk,
        Self::Tieut,
        Self::Pieup,
        Self::Hieut,
    ];

    /// Position in composition order (0..=18)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Looks up a consonant by composition index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Compatibility jamo used for display and configuration (ㄱ, ㄲ, ...)
    pub fn jamo(self) -> char {
        match self {
            Self::Giyeok => 'ㄱ',
            Self::SsangGiyeok => 'ㄲ',
            Self::Nieun => 'ㄴ',
            Self::Digeut => 'ㄷ',
            Self::SsangDigeut => 'ㄸ',
            Self::Rieul => 'ㄹ',
            Self::Mieum => 'ㅁ',
            Self::Bieup => 'ㅂ',
            Self::SsangBieup => 'ㅃ',
            Self::Siot => 'ㅅ',
            Self::SsangSiot => 'ㅆ',
            Self::Ieung => 'ㅇ',
            Self::Jieut => 'ㅈ',
            Self::SsangJieut => 'ㅉ',
            Self::Chieut => 'ㅊ',
            Self::Kieuk => 'ㅋ',
            Self::Tieut => 'ㅌ',
            Self::Pieup => 'ㅍ',
            Self::Hieut => 'ㅎ',
        }
    }

    /// Parses a compatibility jamo back into a consonant
    pub fn from_jamo(jamo: char) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.jamo() == jamo)
    }

    /// Storage partition holding words that start with this consonant
    pub fn partition(self) -> &'static str {
        match self {
            Self::Giyeok => "dict_g",
            Self::SsangGiyeok => "dict_gg",
            Self::Nieun => "dict_n",
            Self::Digeut => "dict_d",
            Self::SsangDigeut => "dict_dd",
            Self::Rieul => "dict_r",
            Self::Mieum => "dict_m",
            Self::Bieup => "dict_b",
            Self::SsangBieup => "dict_bb",
            Self::Siot => "dict_s",
            Self::SsangSiot => "dict_ss",
            Self::Ieung => "dict_ng",
            Self::Jieut => "dict_j",
            Self::SsangJieut => "dict_jj",
            Self::Chieut => "dict_ch",
            Self::Kieuk => "dict_k",
            Self::Tieut => "dict_t",
            Self::Pieup => "dict_p",
            Self::Hieut => "dict_h",
        }
    }

    /// Initial consonant of a precomposed syllable
    ///
    /// Computed as `(codepoint - 0xAC00) / 28 / 21`. Anything outside the
    /// syllable block (including conjoining jamo) has no initial consonant.
    pub fn of_syllable(syllable: char) -> Option<Self> {
        let code = syllable as u32;
        if !(SYLLABLE_BASE..=SYLLABLE_LAST).contains(&code) {
            return None;
        }
        let index = (code - SYLLABLE_BASE) as usize / 28 / 21;
        Self::from_index(index)
    }
}

impl fmt::Display for Consonant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.jamo())
    }
}
