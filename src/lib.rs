//! Party deduplication library - shared modules for the CLI and callers.
//!
//! Resolves court-party names that refer to the same real-world party:
//! normalize, merge exact duplicates, block by a cheap key, score candidate
//! pairs, and greedily cluster.

pub mod blocking;
pub mod cluster;
pub mod config;
pub mod io;
pub mod merge;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod safety;
pub mod scoring;

pub use config::DedupConfig;
pub use models::{Cluster, DedupStats, PartyRecord};
pub use pipeline::{deduplicate, DedupOutput};
pub use scoring::Algorithm;
