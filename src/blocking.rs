//! Blocking keys and candidate windows.
//!
//! A block key is a cheap locality proxy: names a few edits apart tend to land
//! on nearby keys. It has false positives and false negatives and only decides
//! which pairs get scored, never whether they match.

use rayon::prelude::*;

use crate::models::{BlockedRecord, NormalizedRecord};

/// Weight of the character count relative to the letter sum
pub const LENGTH_WEIGHT: u64 = 33;

/// Candidate window is `[key * WINDOW_LOWER, key * WINDOW_UPPER]`
pub const WINDOW_LOWER: f64 = 0.8;
pub const WINDOW_UPPER: f64 = 1.2;

/// Alphabet position of an ASCII letter (a/A = 1 ... z/Z = 26), 0 for anything else.
pub fn letter_value(c: char) -> u64 {
    if c.is_ascii_alphabetic() {
        (c.to_ascii_lowercase() as u8 - b'a' + 1) as u64
    } else {
        0
    }
}

pub fn letter_sum(name: &str) -> u64 {
    name.chars().map(letter_value).sum()
}

/// `letter_sum + char_count * LENGTH_WEIGHT`
pub fn block_key(name: &str) -> u64 {
    letter_sum(name) + name.chars().count() as u64 * LENGTH_WEIGHT
}

/// Inclusive key bounds of the candidate window around `key`.
/// For `key == 0` (only the empty name) the window is the single point 0.
pub fn window_bounds(key: u64) -> (f64, f64) {
    let key = key as f64;
    (key * WINDOW_LOWER, key * WINDOW_UPPER)
}

/// Attach block keys to the working set. Order is preserved.
pub fn assign_block_keys(records: Vec<NormalizedRecord>) -> Vec<BlockedRecord> {
    records
        .into_par_iter()
        .map(|inner| {
            let block_key = block_key(&inner.normalized_name);
            BlockedRecord { inner, block_key }
        })
        .collect()
}

// ============================================================================
// Block Index
// ============================================================================

/// Working-set positions sorted by block key, so a window is two binary searches.
#[derive(Debug, Clone)]
pub struct BlockIndex {
    sorted: Vec<(u64, usize)>, // (block_key, working-set position)
}

impl BlockIndex {
    pub fn build(records: &[BlockedRecord]) -> Self {
        let mut sorted: Vec<(u64, usize)> = records
            .iter()
            .enumerate()
            .map(|(idx, r)| (r.block_key, idx))
            .collect();
        sorted.sort_unstable();
        Self { sorted }
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Positions whose key lies in the window around `key`, in working-set order.
    pub fn window(&self, key: u64) -> Vec<usize> {
        let (lower, upper) = window_bounds(key);
        let start = self.sorted.partition_point(|&(k, _)| (k as f64) < lower);
        let end = self.sorted.partition_point(|&(k, _)| (k as f64) <= upper);
        if start >= end {
            return Vec::new();
        }

        let mut members: Vec<usize> = self.sorted[start..end].iter().map(|&(_, idx)| idx).collect();
        members.sort_unstable();
        members
    }
}
