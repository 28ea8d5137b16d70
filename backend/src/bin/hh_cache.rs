//! Bin cache batch job.
//!
//! Aggregates every encounter of an input bundle, validates the bins, and
//! either stores them in the bin cache (first run) or checks them against the
//! cached entry (later runs).
//!
//! # Usage
//!
//! ```bash
//! hh-cache encounters.json
//! hh-cache encounters.json --config hammerhead.toml --verify-only
//! ```
//!
//! The input bundle looks like:
//!
//! ```json
//! {"encounters": [{"id": "E04", "perihelion": "2020-01-29T09:37:00Z",
//!                  "trajectory": [[1580046000.0, 81.2], ...],
//!                  "detections": [1580046012.5, ...]}]}
//! ```
//!
//! # Environment Variables
//!
//! - `HAMMERHEAD_CONFIG`: Configuration file used when `--config` is absent
//! - `RUST_LOG`: Log level (default: info)
//!
//! Every encounter is processed even when an earlier one fails, and
//! encounters with interior backward bins are never cached. Exits non-zero
//! when any encounter failed.

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hammerhead_rust::db::{run_batch, BinCache, CacheMode, InputBundle};
use hammerhead_rust::PipelineConfig;

#[derive(Parser, Debug)]
#[command(
    name = "hh-cache",
    version,
    about = "Aggregate encounter bins and populate or verify the bin cache"
)]
struct Args {
    /// Input bundle (JSON)
    input: PathBuf,

    /// Configuration file; falls back to HAMMERHEAD_CONFIG and the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Compare against the cache without inserting new encounters
    #[arg(long)]
    verify_only: bool,
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::from_env()?,
    };

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input bundle {}", args.input.display()))?;
    let bundle: InputBundle =
        serde_json::from_str(&content).context("Failed to parse input bundle")?;
    info!(
        "Loaded {} encounters from {}",
        bundle.encounters.len(),
        args.input.display()
    );

    let cache_path = &config.cache.path;
    let mut cache = BinCache::load(cache_path)
        .with_context(|| format!("Failed to load bin cache {}", cache_path.display()))?;

    let mode = if args.verify_only {
        CacheMode::VerifyOnly
    } else {
        CacheMode::Populate
    };
    let summary = run_batch(&bundle, &mut cache, &config, mode);

    if summary.inserted > 0 {
        cache
            .save(cache_path)
            .with_context(|| format!("Failed to save bin cache {}", cache_path.display()))?;
        info!("Cached {} new encounters", summary.inserted);
    }
    info!(
        "{} matched, {} inserted, {} not cached, {} failed",
        summary.matched,
        summary.inserted,
        summary.not_cached,
        summary.failures.len()
    );

    if !summary.is_success() {
        let ids: Vec<&str> = summary.failures.iter().map(|(id, _)| id.as_str()).collect();
        bail!(
            "{} encounter(s) failed validation or verification: {}",
            ids.len(),
            ids.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_all_options() {
        let args = Args::try_parse_from([
            "hh-cache",
            "encounters.json",
            "--config",
            "hammerhead.toml",
            "--verify-only",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("encounters.json"));
        assert_eq!(args.config, Some(PathBuf::from("hammerhead.toml")));
        assert!(args.verify_only);
    }

    #[test]
    fn test_input_is_required() {
        assert!(Args::try_parse_from(["hh-cache", "--verify-only"]).is_err());
        assert!(Args::try_parse_from(["hh-cache", "a.json", "--unknown"]).is_err());
    }
}
