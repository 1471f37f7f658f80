//! Dataset build pipeline: scan → dedup → bounded parallel extraction → store.

pub mod coordinator;
pub mod progress;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::BuildConfig;
use crate::db::{write_permit, DatasetDb, DbError, StoreError, StoreWriter};
use crate::scan::{filter_ingested, scan_object_files, scan_object_files_lenient, ScanError};
use crate::services::extraction::{ExtractionAdapter, ExtractionError};
use crate::vocab::InstructionConverter;

pub use coordinator::{Coordinator, PipelineOptions, RunStats};
pub use progress::{LogProgress, NoProgress, ProgressReporter};

/// Fatal pipeline errors. Any of these ends the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Aborting due to timeout: {path} (no result after {after:?}; raise the per-file timeout to allow slower files)")]
    Timeout { path: PathBuf, after: Duration },

    #[error("Aborting due to error: {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: ExtractionError,
    },

    #[error("Failed to store functions of {path}: {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl PipelineError {
    /// The object file that caused the failure, if the error is tied to one.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            PipelineError::Timeout { path, .. }
            | PipelineError::Extraction { path, .. }
            | PipelineError::Store { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Everything a finished build reports.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub root: PathBuf,
    pub db_path: PathBuf,
    /// Candidates found by the scan.
    pub found: usize,
    /// Distinct files already present in the store before this run.
    pub already_ingested: usize,
    /// Candidates removed by the dedup filter.
    pub skipped_existing: usize,
    #[serde(flatten)]
    pub run: RunStats,
    pub started_at: String,
    pub finished_at: String,
}

/// Build (or extend) the dataset described by `config`.
///
/// Creates the schema, scans the root, removes already-ingested files and runs
/// the [`Coordinator`] over the rest. The config is expected to be validated.
pub async fn build_dataset(
    config: &BuildConfig,
    adapter: Arc<dyn ExtractionAdapter>,
    converter: Arc<dyn InstructionConverter>,
    progress: Arc<dyn ProgressReporter>,
) -> Result<BuildSummary, PipelineError> {
    let started_at = Utc::now().to_rfc3339();

    info!("Database creation...");
    let db = DatasetDb::open(&config.db_path)?;

    let found = if config.lenient_scan {
        scan_object_files_lenient(&config.root, &config.suffix)?
    } else {
        scan_object_files(&config.root, &config.suffix)?
    };
    info!("Found {} during the scan", found.len());
    let found_count = found.len();

    let dedup = filter_ingested(found, &db, &config.root)?;
    drop(db);

    let writer = StoreWriter::new(&config.db_path, &config.root, write_permit(), converter);
    let coordinator = Coordinator::new(adapter, writer, PipelineOptions::from_config(config))
        .with_progress(progress);
    let run = coordinator.run(dedup.pending).await?;

    info!(
        processed = run.processed,
        functions = run.functions_inserted,
        dropped = run.functions_dropped,
        failed = run.failed_files.len(),
        "Build complete"
    );

    Ok(BuildSummary {
        root: config.root.clone(),
        db_path: config.db_path.clone(),
        found: found_count,
        already_ingested: dedup.already_ingested,
        skipped_existing: dedup.skipped,
        run,
        started_at,
        finished_at: Utc::now().to_rfc3339(),
    })
}
