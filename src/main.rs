use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use party_dedup::config::{ConfigFile, DedupConfig};
use party_dedup::io::{read_party_csv, write_clusters};
use party_dedup::pipeline::deduplicate_with_progress;
use party_dedup::progress::{create_spinner, finish, format_duration, init_tracing, set_log_only};
use party_dedup::safety::validate_output_path;

#[derive(Parser)]
#[command(name = "party-dedup")]
#[command(about = "Merge duplicate court-party names into clusters with summed counts")]
struct Args {
    /// Party-count CSV (party_name, party_count, ...)
    input: PathBuf,

    /// Output table; .csv or .sqlite3, file name must contain "dedup"
    output: PathBuf,

    /// TOML file with any DedupConfig fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// set-ratio (default) or edit-ratio; unknown names fall back to set-ratio
    #[arg(long)]
    algorithm: Option<String>,

    #[arg(long)]
    threshold: Option<f64>,

    /// Only process the first N rows
    #[arg(long)]
    max_records: Option<usize>,

    /// Keep digits in names
    #[arg(long)]
    keep_numbers: bool,

    /// Fold accents and non-Latin scripts to ASCII before matching
    #[arg(long)]
    fold_ascii: bool,

    /// Apply the built-in court-party abbreviations and stopwords
    #[arg(long)]
    builtin_lexicon: bool,

    /// Extra stopwords (comma-separated)
    #[arg(long)]
    stopwords: Option<String>,

    /// Write run statistics as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log phase milestones instead
    #[arg(long)]
    log_only: bool,
}

fn build_config(args: &Args) -> Result<DedupConfig> {
    let mut config = DedupConfig::default();

    if let Some(path) = &args.config {
        config.apply_file(ConfigFile::load(path)?);
    }
    if let Some(selector) = &args.algorithm {
        config.set_algorithm(selector);
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if args.max_records.is_some() {
        config.max_records = args.max_records;
    }
    if args.keep_numbers {
        config.remove_numbers = false;
    }
    if args.fold_ascii {
        config.fold_ascii = true;
    }
    if args.builtin_lexicon {
        config.use_builtin_lexicon = true;
    }
    if let Some(words) = &args.stopwords {
        config.stopwords.get_or_insert_with(Default::default).extend(
            words
                .split(',')
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_only(args.log_only);
    init_tracing("info");

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let config = build_config(&args)?;
    let output_format = validate_output_path(&args.output, "dedup", &[args.input.as_path()])?;
    let (stopword_count, abbreviation_count) = config.lexicon_size();
    tracing::info!(
        algorithm = %config.algorithm,
        threshold = config.threshold,
        max_records = ?config.max_records,
        stopwords = stopword_count,
        abbreviations = abbreviation_count,
        "configuration loaded"
    );

    let start = Instant::now();

    let spinner = create_spinner("Phase 1: Reading party table");
    let records = read_party_csv(&args.input)?;
    finish(&spinner, format!("Phase 1: Read {} party rows", records.len()));

    let output = deduplicate_with_progress(&records, &config);

    if args.output.exists() {
        std::fs::remove_file(&args.output).context("Failed to remove existing output file")?;
    }

    let spinner = create_spinner("Phase 5: Writing clusters");
    write_clusters(&args.output, &output.clusters)?;
    finish(
        &spinner,
        format!("Phase 5: Wrote {} clusters ({:?})", output.clusters.len(), output_format),
    );

    let mut stats = output.stats;
    stats.elapsed_seconds = start.elapsed().as_secs_f64();
    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }
    if args.log_only {
        stats.log_phase("final");
    }

    println!("\n{:=<60}", "");
    println!("Deduplication complete!");
    println!("  Rows processed: {}", stats.input_records - stats.truncated_records);
    if stats.truncated_records > 0 {
        println!("  Rows skipped (max_records): {}", stats.truncated_records);
    }
    println!("  Exact duplicates removed: {}", stats.exact_duplicates_removed);
    println!("  Fuzzy matches: {} ({:.1}% of names)", stats.fuzzy_matches, stats.merge_rate());
    println!("  Clusters: {}", stats.clusters);
    if stats.algorithm_fallback {
        println!("  Algorithm: {} (fallback, selector not recognized)", stats.algorithm);
    } else {
        println!("  Algorithm: {}", stats.algorithm);
    }
    println!("  Elapsed: {}", format_duration(start.elapsed()));
    println!("{:=<60}", "");

    Ok(())
}
