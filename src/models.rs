//! Core data models for party deduplication.
//!
//! This module contains the record types that flow through the pipeline,
//! the output cluster, and run-level statistics.

use serde::Serialize;

// ============================================================================
// Input Models
// ============================================================================

/// Raw party row as loaded from the party-count table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartyRecord {
    pub raw_name: String,
    pub party_type: String, // plaintiff / defendant / ...
    pub address: String,
    pub case_type: String,
    pub year: Option<i32>,
    pub count: u64, // Case occurrences this raw name represents
}

/// Party record with its normalized name.
///
/// Before the exact-merge pass there is one of these per input row. After it,
/// `normalized_name` is unique in the working set and `count` is the sum over
/// every row listed in `source_rows`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub record: PartyRecord,
    pub normalized_name: String,
    pub count: u64,
    pub source_rows: Vec<usize>, // Input row indices this record stands for
}

impl NormalizedRecord {
    pub fn new(row: usize, record: PartyRecord, normalized_name: String) -> Self {
        let count = record.count;
        Self {
            record,
            normalized_name,
            count,
            source_rows: vec![row],
        }
    }
}

/// Working record with its precomputed block key.
/// The key only decides window membership, never the match itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockedRecord {
    pub inner: NormalizedRecord,
    pub block_key: u64,
}

// ============================================================================
// Output Models
// ============================================================================

/// Output unit: every record judged to be the same real-world party.
///
/// List-valued fields keep insertion order and hold distinct values only.
/// `canonical_name` is never repeated in `aliases`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Cluster {
    pub canonical_name: String,
    pub aliases: Vec<String>,
    pub party_types: Vec<String>,
    pub addresses: Vec<String>,
    pub case_types: Vec<String>,
    pub years: Vec<i32>,
    pub total_count: u64,
    #[serde(skip)]
    pub source_rows: Vec<usize>,
}

impl Cluster {
    /// Seed a cluster from its anchor record.
    pub fn seed(anchor: &NormalizedRecord) -> Self {
        let record = &anchor.record;
        Self {
            canonical_name: anchor.normalized_name.clone(),
            aliases: Vec::new(),
            party_types: vec![record.party_type.clone()],
            addresses: vec![record.address.clone()],
            case_types: vec![record.case_type.clone()],
            years: record.year.into_iter().collect(),
            total_count: anchor.count,
            source_rows: anchor.source_rows.clone(),
        }
    }

    /// Fold a matched record into this cluster.
    pub fn absorb(&mut self, other: &NormalizedRecord) {
        if other.normalized_name != self.canonical_name {
            push_unique(&mut self.aliases, &other.normalized_name);
        }
        let record = &other.record;
        push_unique(&mut self.party_types, &record.party_type);
        push_unique(&mut self.addresses, &record.address);
        push_unique(&mut self.case_types, &record.case_type);
        if let Some(year) = record.year {
            if !self.years.contains(&year) {
                self.years.push(year);
            }
        }
        self.total_count += other.count;
        self.source_rows.extend_from_slice(&other.source_rows);
    }

    /// Number of distinct normalized names in the cluster.
    pub fn name_count(&self) -> usize {
        1 + self.aliases.len()
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    if !values.iter().any(|v| v == value) {
        values.push(value.to_string());
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Run-level statistics for one deduplication pass.
#[derive(Default, Debug, Clone, Serialize)]
pub struct DedupStats {
    // Input
    pub input_records: usize,
    pub truncated_records: usize, // Rows past max_records, excluded from output
    pub input_count_total: u64,

    // Exact-merge pass
    pub exact_duplicates_removed: usize,
    pub working_records: usize,
    pub empty_names: usize, // Rows whose name normalized to ""

    // Cluster builder
    pub comparisons: usize,
    pub fuzzy_matches: usize,
    pub clusters: usize,
    pub singleton_clusters: usize,
    pub largest_cluster: usize, // In distinct normalized names

    // Configuration echo
    pub algorithm: String,
    pub algorithm_fallback: bool, // Selector string was not recognized
    pub threshold: f64,

    // Timing
    pub elapsed_seconds: f64,
}

impl DedupStats {
    /// Share of working records folded into another record's cluster, as a percentage
    pub fn merge_rate(&self) -> f64 {
        if self.working_records == 0 {
            0.0
        } else {
            100.0 * self.fuzzy_matches as f64 / self.working_records as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Record the shape of a finished cluster
    pub fn record_cluster(&mut self, cluster: &Cluster) {
        self.clusters += 1;
        let names = cluster.name_count();
        if names == 1 {
            self.singleton_clusters += 1;
        }
        self.largest_cluster = self.largest_cluster.max(names);
    }
}
