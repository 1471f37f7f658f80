use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::FunctionMap;

/// Default analysis depth handed to backends that support one.
pub const DEFAULT_DEPTH: u32 = 5;

/// Request to extract every function of one object file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub path: PathBuf,
    /// Only keep functions named by symbols (drop tool-generated names).
    pub use_symbol: bool,
    /// Analysis depth passed through to the backend.
    pub depth: u32,
}

impl ExtractionRequest {
    pub fn new(path: impl Into<PathBuf>, use_symbol: bool, depth: u32) -> Self {
        Self { path: path.into(), use_symbol, depth }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Object file not found at {0}")]
    MissingFile(PathBuf),
    #[error("Extraction backend not found: {0}")]
    MissingBackend(String),
    #[error("Extraction backend error: {0}")]
    Backend(String),
}

/// External tool a backend runs, as resolved on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub path: PathBuf,
    /// Version reported by the tool, when it could be run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Why the tool could not be run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolStatus {
    pub fn from_version(path: PathBuf, version: Result<String, ExtractionError>) -> Self {
        match version {
            Ok(version) => Self { path, version: Some(version), error: None },
            Err(err) => Self { path, version: None, error: Some(err.to_string()) },
        }
    }
}

/// Trait implemented by extraction backends (e.g., rizin, pre-extracted sidecars).
///
/// `extract` may be dropped mid-flight when the caller's deadline expires;
/// implementations must not leave child processes behind when that happens.
#[async_trait]
pub trait ExtractionAdapter: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<FunctionMap, ExtractionError>;

    /// Called once the file's functions have been persisted.
    fn release(&self, _request: &ExtractionRequest) {}

    fn name(&self) -> &'static str;

    /// One-line description for listings.
    fn description(&self) -> &'static str {
        ""
    }

    /// The external tool this backend depends on, if any.
    fn tool_status(&self) -> Option<ToolStatus> {
        None
    }
}

/// Registry for extraction backends; callers select by name.
#[derive(Default)]
pub struct ExtractorRegistry {
    backends: HashMap<String, Arc<dyn ExtractionAdapter>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    pub fn register<B: ExtractionAdapter + 'static>(&mut self, backend: B) -> &mut Self {
        self.backends.insert(backend.name().to_string(), Arc::new(backend));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ExtractionAdapter>> {
        self.backends.get(name).cloned()
    }

    /// Resolve a backend or report the known names.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ExtractionAdapter>, ExtractionError> {
        self.get(name).ok_or_else(|| {
            ExtractionError::MissingBackend(format!(
                "{} (available: {})",
                name,
                self.names().join(", ")
            ))
        })
    }

    /// Return a sorted list of registered backend names for error messages/help.
    pub fn names(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.backends.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Registry populated with every backend compiled into this build.
///
/// `rizin_path` overrides where the rizin binary is looked up.
pub fn default_extractor_registry(rizin_path: Option<PathBuf>) -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    registry.register(crate::services::backends::SidecarExtractor);
    #[cfg(feature = "rizin-backend")]
    {
        registry.register(crate::services::backends::RizinExtractor::new(rizin_path));
    }
    #[cfg(not(feature = "rizin-backend"))]
    let _ = rizin_path;
    registry
}
