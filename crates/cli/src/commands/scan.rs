use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use asmdb_core::model::FileIdentity;
use asmdb_core::scan::{remove_ingested, scan_object_files};

use crate::canonicalize_or_current;
use crate::commands::{open_existing_db, print_json};

#[derive(Debug, Serialize)]
pub struct ScanCandidate {
    pub path: PathBuf,
    /// `None` when the path is too shallow to carry an identity.
    pub identity: Option<FileIdentity>,
    /// Segments above the identity; such files are re-extracted by every build.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested_under: Option<PathBuf>,
    pub pending: bool,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub root: PathBuf,
    pub found: usize,
    pub pending: usize,
    pub already_ingested: usize,
    pub candidates: Vec<ScanCandidate>,
}

/// Dry run: list candidates under `root` and which of them a build would process.
///
/// With `db` pointing at an existing dataset, already-ingested files are marked
/// as not pending. The dataset is never created here.
pub fn scan_command(root: &str, db: Option<&str>, suffix: &str, json: bool) -> Result<()> {
    let root_path = canonicalize_or_current(root)?;
    let mut found = scan_object_files(&root_path, suffix)
        .with_context(|| format!("Failed to scan {}", root_path.display()))?;
    found.sort();

    let ingested = match db {
        Some(db) => {
            let db_path = canonicalize_or_current(db)?;
            if db_path.is_file() {
                open_existing_db(&db_path)?.ingested_files()?
            } else {
                Vec::new()
            }
        }
        None => Vec::new(),
    };
    let outcome = remove_ingested(found.clone(), &ingested, &root_path);

    let candidates: Vec<ScanCandidate> = found
        .into_iter()
        .map(|path| ScanCandidate {
            identity: FileIdentity::from_path(&root_path, &path),
            nested_under: FileIdentity::dropped_prefix(&root_path, &path),
            pending: outcome.pending.contains(&path),
            path,
        })
        .collect();
    let report = ScanReport {
        root: root_path,
        found: candidates.len(),
        pending: outcome.pending.len(),
        already_ingested: outcome.skipped,
        candidates,
    };

    if json {
        return print_json(&report);
    }

    println!("Root: {}", report.root.display());
    println!(
        "Found: {} (pending: {}, already ingested: {})",
        report.found, report.pending, report.already_ingested
    );
    for candidate in &report.candidates {
        let marker = if candidate.pending { "+" } else { "=" };
        let note = match (&candidate.identity, &candidate.nested_under) {
            (None, _) => " (too shallow, no rows)".to_string(),
            (Some(_), Some(prefix)) => {
                format!(" (nested under {}, re-extracted on every build)", prefix.display())
            }
            (Some(_), None) => String::new(),
        };
        println!("{marker} {}{note}", candidate.path.display());
    }
    Ok(())
}
