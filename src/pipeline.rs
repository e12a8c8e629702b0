//! End-to-end deduplication run.
//!
//! Phases, in order: truncate to `max_records`, normalize, exact-merge,
//! assign block keys, cluster. Normalization and keying are per-record and
//! run on the rayon pool; results come back in input order so the
//! order-sensitive cluster pass is unaffected.

use indicatif::ProgressBar;
use rayon::prelude::*;
use std::time::Instant;

use crate::blocking::assign_block_keys;
use crate::cluster::build_clusters;
use crate::config::DedupConfig;
use crate::merge::exact_merge;
use crate::models::{Cluster, DedupStats, NormalizedRecord, PartyRecord};
use crate::normalize::Normalizer;
use crate::progress::{create_progress_bar, create_spinner, finish};

#[derive(Debug, Clone)]
pub struct DedupOutput {
    pub clusters: Vec<Cluster>,
    pub stats: DedupStats,
}

/// Normalize every record, tagging each with its input row index.
pub fn normalize_records(records: &[PartyRecord], normalizer: &Normalizer) -> Vec<NormalizedRecord> {
    records
        .par_iter()
        .enumerate()
        .map(|(row, record)| {
            let normalized_name = normalizer.normalize(&record.raw_name);
            NormalizedRecord::new(row, record.clone(), normalized_name)
        })
        .collect()
}

/// Run silently. Records past `config.max_records` are ignored.
pub fn deduplicate(records: &[PartyRecord], config: &DedupConfig) -> DedupOutput {
    run(records, config, false)
}

/// Run with per-phase progress bars (or log lines in log-only mode).
pub fn deduplicate_with_progress(records: &[PartyRecord], config: &DedupConfig) -> DedupOutput {
    run(records, config, true)
}

fn run(records: &[PartyRecord], config: &DedupConfig, report: bool) -> DedupOutput {
    let start = Instant::now();
    let mut stats = DedupStats {
        input_records: records.len(),
        algorithm: config.algorithm.name().to_string(),
        algorithm_fallback: config.algorithm_fallback,
        threshold: config.threshold,
        ..DedupStats::default()
    };

    let limit = config.max_records.unwrap_or(records.len()).min(records.len());
    let processed = &records[..limit];
    stats.truncated_records = records.len() - limit;
    stats.input_count_total = processed.iter().map(|r| r.count).sum();
    if stats.truncated_records > 0 {
        tracing::info!(
            kept = limit,
            skipped = stats.truncated_records,
            "max_records reached, ignoring remaining rows"
        );
    }

    // Phase 2: normalize
    let spinner = phase_spinner(report, "Phase 2: Normalizing names");
    let normalizer = config.normalizer();
    let normalized = normalize_records(processed, &normalizer);
    stats.empty_names = normalized.iter().filter(|r| r.normalized_name.is_empty()).count();
    finish(&spinner, format!("Phase 2: Normalized {} names", normalized.len()));

    // Phase 3: exact merge + block keys
    let spinner = phase_spinner(report, "Phase 3: Merging exact duplicates");
    let merged = exact_merge(normalized);
    stats.exact_duplicates_removed = merged.duplicates_removed;
    stats.working_records = merged.records.len();
    let blocked = assign_block_keys(merged.records);
    finish(
        &spinner,
        format!(
            "Phase 3: Removed {} exact duplicates, {} distinct names remain",
            stats.exact_duplicates_removed, stats.working_records
        ),
    );

    // Phase 4: cluster
    let pb = if report {
        create_progress_bar(blocked.len() as u64, "Phase 4: Clustering")
    } else {
        ProgressBar::hidden()
    };
    let outcome = build_clusters(&blocked, config.algorithm, config.threshold, &pb);
    stats.comparisons = outcome.comparisons;
    stats.fuzzy_matches = outcome.fuzzy_matches;
    for cluster in &outcome.clusters {
        stats.record_cluster(cluster);
    }
    finish(
        &pb,
        format!(
            "Phase 4: {} clusters from {} names ({} fuzzy matches)",
            stats.clusters, stats.working_records, stats.fuzzy_matches
        ),
    );

    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    tracing::debug!(comparisons = stats.comparisons, "clustering finished");

    DedupOutput {
        clusters: outcome.clusters,
        stats,
    }
}

fn phase_spinner(report: bool, msg: &str) -> ProgressBar {
    if report {
        create_spinner(msg)
    } else {
        ProgressBar::hidden()
    }
}
