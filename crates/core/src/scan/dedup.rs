use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::db::{DatasetDb, DbResult};
use crate::model::FileIdentity;

/// Result of filtering candidates against the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    /// Candidates that still need extraction.
    pub pending: Vec<PathBuf>,
    /// Distinct files already present in `functions`.
    pub already_ingested: usize,
    /// Candidates removed because their file is already ingested.
    pub skipped: usize,
}

/// Remove candidates whose `root/project/compiler/optimization/file_name`
/// path is already present in the store.
///
/// Only exact path matches are removed; candidates without a valid identity
/// are kept and later dropped by the store writer.
pub fn filter_ingested(
    candidates: Vec<PathBuf>,
    db: &DatasetDb,
    root: &Path,
) -> DbResult<DedupOutcome> {
    let ingested = db.ingested_files()?;
    let outcome = remove_ingested(candidates, &ingested, root);
    if outcome.already_ingested > 0 {
        info!(files = outcome.already_ingested, "files already in the database");
    }
    Ok(outcome)
}

/// Pure part of [`filter_ingested`]: drop candidates matching known identities.
pub fn remove_ingested(
    candidates: Vec<PathBuf>,
    ingested: &[FileIdentity],
    root: &Path,
) -> DedupOutcome {
    let known: HashSet<PathBuf> = ingested.iter().map(|id| id.to_path(root)).collect();
    let before = candidates.len();
    let pending: Vec<PathBuf> = candidates.into_iter().filter(|c| !known.contains(c)).collect();
    DedupOutcome { skipped: before - pending.len(), pending, already_ingested: known.len() }
}
