use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use asmdb_core::config::{BuildConfig, FailurePolicy};
use asmdb_core::pipeline::{build_dataset, BuildSummary, LogProgress, ProgressReporter};
use asmdb_core::services::extraction::default_extractor_registry;
use asmdb_core::vocab::Vocabulary;

use crate::canonicalize_or_current;
use crate::commands::{print_json, BarProgress};

/// Flags of `asmdb build`. Unset flags fall back to the config file, then defaults.
#[derive(Args, Debug, Default, Clone)]
pub struct BuildArgs {
    /// Root of the `<project>/<compiler>/<optimization>/<file>` tree.
    #[arg(long)]
    pub root: Option<String>,

    /// SQLite dataset to create or extend.
    #[arg(long)]
    pub db: Option<String>,

    /// JSON build config; flags override its values.
    #[arg(long)]
    pub config: Option<String>,

    /// Vocabulary JSON mapping instruction tokens to ids.
    #[arg(long)]
    pub vocab: Option<String>,

    /// Extraction backend (see `asmdb extractors`).
    #[arg(long)]
    pub extractor: Option<String>,

    /// Path to the rizin binary (defaults to RIZIN_BIN, then `rizin` on PATH).
    #[arg(long)]
    pub rizin: Option<String>,

    /// Number of files extracted in parallel (defaults to the CPU count).
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Per-file extraction deadline in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Keep only functions with a real symbol name.
    #[arg(long, default_value_t = false)]
    pub use_symbol: bool,

    /// Analysis depth passed to the extractor.
    #[arg(long)]
    pub depth: Option<u32>,

    /// Files a worker handles before it is replaced.
    #[arg(long)]
    pub max_tasks_per_worker: Option<usize>,

    /// Process files in scan order instead of shuffling them.
    #[arg(long, default_value_t = false)]
    pub no_shuffle: bool,

    /// Fixed shuffle seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Suffix of candidate object files.
    #[arg(long)]
    pub suffix: Option<String>,

    /// Skip files that fail or time out instead of aborting the run.
    #[arg(long, default_value_t = false)]
    pub keep_going: bool,

    /// Skip unreadable directories during the scan.
    #[arg(long, default_value_t = false)]
    pub lenient_scan: bool,

    /// Emit the build summary as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Merge config file, flags and defaults into a validated [`BuildConfig`].
pub fn resolve_build_config(args: &BuildArgs) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let path = canonicalize_or_current(path)?;
            BuildConfig::load(&path)?
        }
        None => BuildConfig::default(),
    };

    if let Some(root) = &args.root {
        config.root = PathBuf::from(root);
    }
    if let Some(db) = &args.db {
        config.db_path = PathBuf::from(db);
    }
    if let Some(vocab) = &args.vocab {
        config.vocab_path = PathBuf::from(vocab);
    }
    if let Some(extractor) = &args.extractor {
        config.extractor = extractor.clone();
    }
    if let Some(rizin) = &args.rizin {
        config.rizin_path = Some(PathBuf::from(rizin));
    }
    if let Some(jobs) = args.jobs {
        config.concurrency = Some(jobs);
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if args.use_symbol {
        config.use_symbol = true;
    }
    if let Some(depth) = args.depth {
        config.depth = depth;
    }
    if let Some(max_tasks) = args.max_tasks_per_worker {
        config.max_tasks_per_worker = max_tasks;
    }
    if args.no_shuffle {
        config.shuffle = false;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(suffix) = &args.suffix {
        config.suffix = suffix.clone();
    }
    if args.keep_going {
        config.failure_policy = FailurePolicy::SkipFile;
    }
    if args.lenient_scan {
        config.lenient_scan = true;
    }

    // Relative paths are taken from the working directory, not the config file.
    config.root = canonicalize_or_current(&config.root.to_string_lossy())?;
    config.db_path = canonicalize_or_current(&config.db_path.to_string_lossy())?;
    config.vocab_path = canonicalize_or_current(&config.vocab_path.to_string_lossy())?;

    config.validate()?;
    Ok(config)
}

/// Scan, dedup and extract every pending object file into the dataset.
pub async fn build_command(args: &BuildArgs) -> Result<BuildSummary> {
    let config = resolve_build_config(args)?;

    let vocab = Vocabulary::load(&config.vocab_path)?;
    tracing::debug!(tokens = vocab.len(), path = %config.vocab_path.display(), "vocabulary loaded");

    let registry = default_extractor_registry(config.rizin_path.clone());
    let adapter = registry.resolve(&config.extractor)?;

    let bar = (!args.json && std::io::stderr().is_terminal()).then(|| Arc::new(BarProgress::new()));
    let progress: Arc<dyn ProgressReporter> = match &bar {
        Some(bar) => bar.clone(),
        None => Arc::new(LogProgress),
    };

    let result = build_dataset(&config, adapter, Arc::new(vocab), progress).await;
    if let (Err(_), Some(bar)) = (&result, &bar) {
        bar.abandon();
    }
    let summary = result
        .with_context(|| format!("Dataset build failed for {}", config.root.display()))?;

    if args.json {
        print_json(&summary)?;
    } else {
        print_summary(&summary);
    }
    Ok(summary)
}

fn print_summary(summary: &BuildSummary) {
    println!("Dataset: {}", summary.db_path.display());
    println!("Root: {}", summary.root.display());
    println!(
        "Found {} files ({} already ingested, {} scheduled)",
        summary.found, summary.skipped_existing, summary.run.scheduled
    );
    println!(
        "Processed {} files: {} functions inserted, {} dropped",
        summary.run.processed, summary.run.functions_inserted, summary.run.functions_dropped
    );
    if !summary.run.failed_files.is_empty() {
        println!("Skipped {} failing files:", summary.run.failed_files.len());
        for path in &summary.run.failed_files {
            println!("- {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("build.json");
        std::fs::write(
            &config_path,
            r#"{"timeout_secs": 30, "extractor": "sidecar", "shuffle": true, "depth": 2}"#,
        )
        .unwrap();

        let args = BuildArgs {
            config: Some(config_path.to_string_lossy().to_string()),
            root: Some(dir.path().to_string_lossy().to_string()),
            timeout: Some(7),
            no_shuffle: true,
            keep_going: true,
            ..BuildArgs::default()
        };
        let config = resolve_build_config(&args).unwrap();
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.extractor, "sidecar");
        assert_eq!(config.depth, 2);
        assert!(!config.shuffle);
        assert_eq!(config.failure_policy, FailurePolicy::SkipFile);
        assert!(config.root.is_absolute());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let args = BuildArgs { timeout: Some(0), ..BuildArgs::default() };
        assert!(resolve_build_config(&args).is_err());
        let args = BuildArgs { jobs: Some(0), ..BuildArgs::default() };
        assert!(resolve_build_config(&args).is_err());
    }
}
