//! Build configuration.
//!
//! Loaded from an optional JSON file; every field has a default so a config
//! file only needs the values it changes. Frontends apply their own overrides
//! (CLI flags) on top before calling [`BuildConfig::validate`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scan::OBJECT_SUFFIX;
use crate::services::extraction::DEFAULT_DEPTH;
use crate::vocab::DEFAULT_VOCAB_PATH;

/// Default per-file extraction deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Files a worker handles before it is replaced by a fresh one.
pub const DEFAULT_MAX_TASKS_PER_WORKER: usize = 20;

pub const DEFAULT_EXTRACTOR: &str = "rizin";

pub const DEFAULT_DB_PATH: &str = "dataset.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse config at {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What to do when one file fails to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Cancel the whole run on the first failure or timeout.
    #[default]
    Abort,
    /// Log the failure, count it, and keep going with the remaining files.
    SkipFile,
}

/// Serializable configuration for a dataset build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Root of the `<project>/<compiler>/<optimization>/<file>` tree.
    pub root: PathBuf,
    /// SQLite store to create or extend.
    pub db_path: PathBuf,
    /// Vocabulary JSON (`token -> id`).
    pub vocab_path: PathBuf,
    /// Name of the extraction backend.
    pub extractor: String,
    /// Optional explicit rizin binary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rizin_path: Option<PathBuf>,
    /// Suffix of candidate object files.
    pub suffix: String,
    /// Worker count; `None` means available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    pub timeout_secs: u64,
    pub use_symbol: bool,
    pub depth: u32,
    pub max_tasks_per_worker: usize,
    pub shuffle: bool,
    /// Fixed shuffle seed for reproducible scheduling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub failure_policy: FailurePolicy,
    /// Skip unreadable subtrees during the scan instead of failing.
    pub lenient_scan: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            vocab_path: PathBuf::from(DEFAULT_VOCAB_PATH),
            extractor: DEFAULT_EXTRACTOR.to_string(),
            rizin_path: None,
            suffix: OBJECT_SUFFIX.to_string(),
            concurrency: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            use_symbol: false,
            depth: DEFAULT_DEPTH,
            max_tasks_per_worker: DEFAULT_MAX_TASKS_PER_WORKER,
            shuffle: true,
            seed: None,
            failure_policy: FailurePolicy::Abort,
            lenient_scan: false,
        }
    }
}

impl BuildConfig {
    /// Load a config JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&body)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Worker count after resolving the default.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be greater than zero".into()));
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::Invalid("concurrency must be greater than zero".into()));
        }
        if self.max_tasks_per_worker == 0 {
            return Err(ConfigError::Invalid(
                "max_tasks_per_worker must be greater than zero".into(),
            ));
        }
        if self.suffix.is_empty() {
            return Err(ConfigError::Invalid("suffix must not be empty".into()));
        }
        Ok(())
    }
}
