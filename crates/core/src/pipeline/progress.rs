use std::path::Path;

use tracing::{debug, info};

/// Receives progress as files complete, in completion order.
pub trait ProgressReporter: Send + Sync {
    fn started(&self, _total: usize) {}

    /// `done` counts every finished file, including skipped failures.
    fn file_finished(&self, _done: usize, _total: usize, _path: &Path) {}

    fn finished(&self) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Reports progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn started(&self, total: usize) {
        info!("Find {} files to analyze", total);
    }

    fn file_finished(&self, done: usize, total: usize, path: &Path) {
        debug!(path = %path.display(), "{}/{} files", done, total);
    }

    fn finished(&self) {
        info!("Extraction finished");
    }
}
