//! Similarity scoring for normalized party names.
//!
//! Two interchangeable algorithms, both returning a ratio in [0.0, 1.0]:
//! - Set ratio: Ratcliff/Obershelp matching-block ratio
//! - Edit ratio: Levenshtein distance scaled by the longer name

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Score Thresholds
// ============================================================================

/// Minimum similarity to merge two names
pub const DEFAULT_THRESHOLD: f64 = 0.8;

// ============================================================================
// Algorithm Selection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Ratcliff/Obershelp: 2 * matched chars / total chars
    #[default]
    SetRatio,
    /// 1 - levenshtein / longer length, on a 0-100 integer scale
    EditRatio,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::SetRatio => "set-ratio",
            Algorithm::EditRatio => "edit-ratio",
        }
    }

    /// Strict parse. Accepts the legacy selectors "seq" and "levenshtein".
    pub fn parse(selector: &str) -> Option<Self> {
        match selector.trim().to_ascii_lowercase().as_str() {
            "set-ratio" | "set_ratio" | "seq" => Some(Algorithm::SetRatio),
            "edit-ratio" | "edit_ratio" | "levenshtein" => Some(Algorithm::EditRatio),
            _ => None,
        }
    }

    /// Lenient parse: unknown selectors fall back to `SetRatio`.
    /// The second value reports whether the fallback was taken so callers can surface it.
    pub fn from_selector(selector: &str) -> (Self, bool) {
        match Self::parse(selector) {
            Some(algorithm) => (algorithm, false),
            None => {
                tracing::warn!(
                    selector,
                    fallback = Algorithm::SetRatio.name(),
                    "unrecognized similarity algorithm, falling back"
                );
                (Algorithm::SetRatio, true)
            }
        }
    }

    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Algorithm::SetRatio => set_ratio(a, b),
            Algorithm::EditRatio => edit_ratio(a, b),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn is_match(score: f64, threshold: f64) -> bool {
    score >= threshold
}

// ============================================================================
// Set Ratio (Ratcliff/Obershelp)
// ============================================================================

/// Second-string length at which very common characters stop seeding matches.
pub const AUTOJUNK_MIN_LEN: usize = 200;

/// Characters of `b` too frequent to seed a match: once `b` has at least
/// `AUTOJUNK_MIN_LEN` characters, any character occurring more than
/// `len / 100 + 1` times.
fn popular_characters(b: &[char]) -> FxHashSet<char> {
    if b.len() < AUTOJUNK_MIN_LEN {
        return FxHashSet::default();
    }
    let limit = b.len() / 100 + 1;
    let mut counts: FxHashMap<char, usize> = FxHashMap::default();
    for &c in b {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, n)| n > limit)
        .map(|(c, _)| c)
        .collect()
}

/// Longest common block inside `a[alo..ahi]` x `b[blo..bhi]`.
/// Ties go to the block that starts earliest in `a`, then earliest in `b`.
/// Popular characters never seed a block but may extend one at either end
/// (an empty block at `(alo, blo)` included).
/// Returns `(start_a, start_b, size)`; size 0 means no common block.
fn find_longest_match(
    a: &[char],
    b: &[char],
    popular: &FxHashSet<char>,
    (alo, ahi): (usize, usize),
    (blo, bhi): (usize, usize),
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;
    // run lengths ending at (i - 1, j) and (i, j); slot 0 is the j = blo - 1 sentinel
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            curr[slot] = if a[i] == b[j] && !popular.contains(&b[j]) {
                prev[slot - 1] + 1
            } else {
                0
            };
            if curr[slot] > best_size {
                best_size = curr[slot];
                best_i = i + 1 - best_size;
                best_j = j + 1 - best_size;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    if !popular.is_empty() {
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && a[best_i + best_size] == b[best_j + best_size]
        {
            best_size += 1;
        }
    }

    (best_i, best_j, best_size)
}

/// Total size of the matching blocks found by recursive longest-block alignment.
pub fn matching_characters(a: &[char], b: &[char]) -> usize {
    let popular = popular_characters(b);
    let mut pending = vec![((0, a.len()), (0, b.len()))];
    let mut total = 0;

    while let Some(((alo, ahi), (blo, bhi))) = pending.pop() {
        let (i, j, size) = find_longest_match(a, b, &popular, (alo, ahi), (blo, bhi));
        if size == 0 {
            continue;
        }
        total += size;
        if alo < i && blo < j {
            pending.push(((alo, i), (blo, j)));
        }
        if i + size < ahi && j + size < bhi {
            pending.push(((i + size, ahi), (j + size, bhi)));
        }
    }

    total
}

/// Ratcliff/Obershelp similarity. Two empty names score 1.0.
///
/// Follows difflib's autojunk rule: when `b` is `AUTOJUNK_MIN_LEN` characters
/// or longer its popular characters only count when they extend a block, so
/// the score is not symmetric for very long names.
pub fn set_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

// ============================================================================
// Edit Ratio (Levenshtein)
// ============================================================================

/// Edit similarity on a 0-100 scale, rounded to the nearest integer.
pub fn edit_ratio_percent(a: &str, b: &str) -> u32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 100;
    }
    let distance = strsim::levenshtein(a, b);
    (100.0 * (1.0 - distance as f64 / longest as f64)).round() as u32
}

/// Edit similarity in [0.0, 1.0]; two decimal places of resolution.
pub fn edit_ratio(a: &str, b: &str) -> f64 {
    edit_ratio_percent(a, b) as f64 / 100.0
}
