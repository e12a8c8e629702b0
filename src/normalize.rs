//! Party-name normalization.
//!
//! Steps run in a fixed order: optional ASCII folding, punctuation (and
//! optionally digit) removal, whitespace collapsing, lowercasing, stopword
//! removal, abbreviation substitution. Token-level steps only ever see the
//! cleaned, lowercased text.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Regex to collapse whitespace runs into a single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// BUILT-IN LEXICON
// ============================================================================

/// Abbreviations for terms that recur across unrelated court parties.
/// Shortening them keeps shared filler words from dominating the similarity score.
pub static BUILTIN_ABBREVIATIONS: Lazy<FxHashMap<&str, &str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();

    // Housing
    m.insert("apartment", "apt");
    m.insert("apartments", "apt");
    m.insert("homes", "hms");
    m.insert("manor", "mn");
    m.insert("place", "pl");
    m.insert("property", "prop");
    m.insert("properties", "prop");
    m.insert("realty", "rlt");
    m.insert("rental", "rtl");
    m.insert("rentals", "rtl");
    m.insert("furniture", "fur");

    // Corporate
    m.insert("company", "co");
    m.insert("corporation", "corp");
    m.insert("group", "grp");
    m.insert("holdings", "hld");
    m.insert("management", "mgt");
    m.insert("service", "svc");
    m.insert("services", "svc");
    m.insert("acquisitions", "acq");
    m.insert("capital", "cap");

    // Lending and collections
    m.insert("acceptance", "acc");
    m.insert("bank", "bk");
    m.insert("bonding", "bnd");
    m.insert("collection", "col");
    m.insert("credit", "cr");
    m.insert("financial", "fin");
    m.insert("insurance", "ins");
    m.insert("recovery", "rec");
    m.insert("union", "un");

    m
});

/// Entity-suffix tokens dropped before matching
pub static BUILTIN_STOPWORDS: &[&str] = &["llc", "inc", "pllc"];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to ASCII by applying NFKD decomposition and removing combining marks.
/// e.g., "José Peña" → "Jose Pena". Case is preserved; lowercasing happens later.
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    // Transliterate whatever is still non-ASCII (Cyrillic, Greek, CJK, ...)
    any_ascii(&stripped)
}

/// Remove ASCII punctuation, and ASCII digits when `remove_numbers` is set.
pub fn strip_punctuation(s: &str, remove_numbers: bool) -> String {
    s.chars()
        .filter(|c| !(c.is_ascii_punctuation() || (remove_numbers && c.is_ascii_digit())))
        .collect()
}

/// Collapse whitespace runs to one space and trim both ends.
pub fn collapse_whitespace(s: &str) -> String {
    MULTI_SPACE.replace_all(s.trim(), " ").into_owned()
}

// ============================================================================
// NORMALIZER
// ============================================================================

/// Configured name normalizer.
///
/// `None` for `stopwords` or `abbreviations` disables that step entirely.
/// Both tables are matched against whole lowercased tokens, so entries must
/// themselves be lowercase to ever match.
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    pub remove_numbers: bool,
    pub fold_ascii: bool,
    pub stopwords: Option<FxHashSet<String>>,
    pub abbreviations: Option<FxHashMap<String, String>>,
}

impl Normalizer {
    pub fn new(remove_numbers: bool) -> Self {
        Self {
            remove_numbers,
            ..Self::default()
        }
    }

    pub fn with_stopwords<I, S>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = Some(stopwords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_abbreviations<I, K, V>(mut self, abbreviations: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.abbreviations = Some(
            abbreviations
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Normalizer preloaded with the built-in court-party lexicon.
    pub fn with_builtin_lexicon(remove_numbers: bool) -> Self {
        Self::new(remove_numbers)
            .with_stopwords(BUILTIN_STOPWORDS.iter().copied())
            .with_abbreviations(BUILTIN_ABBREVIATIONS.iter().map(|(&k, &v)| (k, v)))
    }

    /// Normalize a raw party name. Never fails; may return "".
    pub fn normalize(&self, raw: &str) -> String {
        let folded;
        let source = if self.fold_ascii {
            folded = fold_to_ascii(raw);
            folded.as_str()
        } else {
            raw
        };

        let stripped = strip_punctuation(source, self.remove_numbers);
        let lowered = collapse_whitespace(&stripped).to_lowercase();

        if self.stopwords.is_none() && self.abbreviations.is_none() {
            return lowered;
        }

        lowered
            .split(' ')
            .filter(|token| {
                self.stopwords
                    .as_ref()
                    .map_or(true, |stopwords| !stopwords.contains(*token))
            })
            .map(|token| {
                self.abbreviations
                    .as_ref()
                    .and_then(|abbreviations| abbreviations.get(token))
                    .map_or(token, String::as_str)
            })
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

// ============================================================================
// TESTS
// ============================================================================
