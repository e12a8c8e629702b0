//! Greedy anchor-centric cluster builder.
//!
//! Records are visited in working-set order. The first unconsumed record
//! anchors a new cluster and absorbs every unconsumed record in its block
//! window that scores at or above the threshold against it.
//!
//! Matching is NOT transitive: if A~B and B~C but not A~C, C stays out of
//! A's cluster even though B joined it. Results depend on input order.

use indicatif::ProgressBar;

use crate::blocking::BlockIndex;
use crate::models::{BlockedRecord, Cluster};
use crate::scoring::{is_match, Algorithm};

/// Per-record consumption state. Consumed is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Unconsumed,
    Consumed,
}

#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    pub clusters: Vec<Cluster>,
    pub comparisons: usize,
    pub fuzzy_matches: usize,
}

/// Arena-backed builder; records are addressed by working-set position.
pub struct ClusterBuilder<'a> {
    records: &'a [BlockedRecord],
    states: Vec<RecordState>,
    index: BlockIndex,
    algorithm: Algorithm,
    threshold: f64,
    comparisons: usize,
    fuzzy_matches: usize,
}

impl<'a> ClusterBuilder<'a> {
    pub fn new(records: &'a [BlockedRecord], algorithm: Algorithm, threshold: f64) -> Self {
        Self {
            records,
            states: vec![RecordState::Unconsumed; records.len()],
            index: BlockIndex::build(records),
            algorithm,
            threshold,
            comparisons: 0,
            fuzzy_matches: 0,
        }
    }

    pub fn state(&self, pos: usize) -> RecordState {
        self.states[pos]
    }

    fn consume(&mut self, pos: usize) {
        self.states[pos] = RecordState::Consumed;
    }

    /// Build the cluster anchored at `anchor`, consuming every member.
    fn grow(&mut self, anchor: usize) -> Cluster {
        let records = self.records;
        self.consume(anchor);
        let anchor_record = &records[anchor];
        let mut cluster = Cluster::seed(&anchor_record.inner);

        for candidate in self.index.window(anchor_record.block_key) {
            if self.states[candidate] == RecordState::Consumed {
                continue;
            }
            let other = &records[candidate];
            self.comparisons += 1;
            let score = self
                .algorithm
                .score(&anchor_record.inner.normalized_name, &other.inner.normalized_name);
            if is_match(score, self.threshold) {
                self.consume(candidate);
                self.fuzzy_matches += 1;
                cluster.absorb(&other.inner);
            }
        }

        cluster
    }

    /// Run the single ordered pass. Every record ends up in exactly one cluster.
    pub fn run(mut self, pb: &ProgressBar) -> ClusterOutcome {
        let mut clusters = Vec::new();

        for pos in 0..self.records.len() {
            if self.states[pos] == RecordState::Consumed {
                continue;
            }
            let cluster = self.grow(pos);
            if !cluster.aliases.is_empty() {
                tracing::debug!(
                    canonical = %cluster.canonical_name,
                    aliases = cluster.aliases.len(),
                    total_count = cluster.total_count,
                    "cluster formed"
                );
            }
            pb.inc(cluster.name_count() as u64);
            clusters.push(cluster);
        }

        debug_assert!(self.states.iter().all(|s| *s == RecordState::Consumed));

        ClusterOutcome {
            clusters,
            comparisons: self.comparisons,
            fuzzy_matches: self.fuzzy_matches,
        }
    }
}

pub fn build_clusters(
    records: &[BlockedRecord],
    algorithm: Algorithm,
    threshold: f64,
    pb: &ProgressBar,
) -> ClusterOutcome {
    ClusterBuilder::new(records, algorithm, threshold).run(pb)
}
