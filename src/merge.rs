//! Exact-merge pass: collapse records whose normalized names are identical.
//!
//! The first record seen for a name keeps its auxiliary attributes; later
//! duplicates only contribute their counts and source rows.

use rustc_hash::FxHashMap;

use crate::models::NormalizedRecord;

#[derive(Debug, Clone)]
pub struct ExactMergeOutcome {
    /// One record per distinct normalized name, in first-seen order
    pub records: Vec<NormalizedRecord>,
    pub duplicates_removed: usize,
}

pub fn exact_merge(records: Vec<NormalizedRecord>) -> ExactMergeOutcome {
    let input_len = records.len();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut merged: Vec<NormalizedRecord> = Vec::with_capacity(input_len);

    for record in records {
        let existing = index.get(&record.normalized_name).copied();
        match existing {
            Some(pos) => {
                let kept = &mut merged[pos];
                kept.count += record.count;
                kept.source_rows.extend(record.source_rows);
            }
            None => {
                index.insert(record.normalized_name.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    ExactMergeOutcome {
        duplicates_removed: input_len - merged.len(),
        records: merged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartyRecord;

    fn record(row: usize, name: &str, party_type: &str, count: u64) -> NormalizedRecord {
        NormalizedRecord::new(
            row,
            PartyRecord {
                raw_name: name.to_string(),
                party_type: party_type.to_string(),
                count,
                ..PartyRecord::default()
            },
            name.to_lowercase(),
        )
    }

    #[test]
    fn test_exact_merge_sums_counts() {
        let outcome = exact_merge(vec![
            record(0, "Acme", "plaintiff", 2),
            record(1, "beta", "plaintiff", 1),
            record(2, "ACME", "defendant", 5),
        ]);

        assert_eq!(outcome.duplicates_removed, 1);
        assert_eq!(outcome.records.len(), 2);
        let acme = &outcome.records[0];
        assert_eq!(acme.normalized_name, "acme");
        assert_eq!(acme.count, 7);
        assert_eq!(acme.source_rows, vec![0, 2]);
        // First-seen attributes win
        assert_eq!(acme.record.party_type, "plaintiff");
        assert_eq!(acme.record.raw_name, "Acme");
    }

    #[test]
    fn test_exact_merge_keeps_first_seen_order() {
        let outcome = exact_merge(vec![
            record(0, "c", "p", 1),
            record(1, "a", "p", 1),
            record(2, "c", "p", 1),
            record(3, "b", "p", 1),
        ]);
        let names: Vec<&str> = outcome.records.iter().map(|r| r.normalized_name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_exact_merge_empty_names_collapse() {
        let outcome = exact_merge(vec![record(0, "", "p", 1), record(1, "", "p", 3)]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].count, 4);
    }

    #[test]
    fn test_exact_merge_empty_input() {
        let outcome = exact_merge(Vec::new());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.duplicates_removed, 0);
    }
}
