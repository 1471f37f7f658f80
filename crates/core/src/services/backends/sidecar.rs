use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::model::FunctionMap;
use crate::services::extraction::{ExtractionAdapter, ExtractionError, ExtractionRequest};

/// Suffix appended to an object file's name to locate its sidecar.
pub const SIDECAR_SUFFIX: &str = ".funcs.json";

/// Reads functions that were extracted ahead of time.
///
/// For `proj/gcc/O2/a.o` the sidecar is `proj/gcc/O2/a.o.funcs.json`, a JSON
/// object mapping function name to `{"asm": ..., "filtered_instructions": [...]}`.
/// `use_symbol` and `depth` have no effect: the sidecar is taken as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarExtractor;

/// Location of the sidecar for `object`.
pub fn sidecar_path(object: &Path) -> PathBuf {
    let mut name = object.as_os_str().to_os_string();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

#[async_trait]
impl ExtractionAdapter for SidecarExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<FunctionMap, ExtractionError> {
        if !request.path.is_file() {
            return Err(ExtractionError::MissingFile(request.path.clone()));
        }
        let path = sidecar_path(&request.path);
        let body = tokio::fs::read_to_string(&path).await.map_err(|e| {
            ExtractionError::Backend(format!("failed to read sidecar {}: {e}", path.display()))
        })?;
        serde_json::from_str(&body).map_err(|e| {
            ExtractionError::Backend(format!("failed to parse sidecar {}: {e}", path.display()))
        })
    }

    fn name(&self) -> &'static str {
        "sidecar"
    }

    fn description(&self) -> &'static str {
        "Reads pre-extracted <object>.funcs.json files"
    }
}
