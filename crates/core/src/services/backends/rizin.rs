use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::model::{ExtractedFunction, FunctionMap};
use crate::services::extraction::{
    ExtractionAdapter, ExtractionError, ExtractionRequest, ToolStatus,
};
use crate::services::normalize::normalize_all;

/// Prefix rizin gives functions it discovered without a symbol.
const AUTO_NAMED_PREFIX: &str = "fcn.";

/// Rizin-backed extractor: one rizin process per object file, printing
/// `pdfj` for every analyzed function.
#[derive(Debug, Clone, Default)]
pub struct RizinExtractor {
    rizin_path: Option<PathBuf>,
}

impl RizinExtractor {
    pub fn new(rizin_path: Option<PathBuf>) -> Self {
        Self { rizin_path }
    }

    /// Binary that will be spawned: explicit path, `RIZIN_BIN`, or `rizin` on PATH.
    pub fn rizin_path(&self) -> PathBuf {
        self.rizin_path.clone().unwrap_or_else(resolve_rizin_path)
    }

    /// Version string reported by `rizin -v`.
    pub fn version(&self) -> Result<String, ExtractionError> {
        version_string(&self.rizin_path()).map_err(ExtractionError::Backend)
    }
}

#[async_trait]
impl ExtractionAdapter for RizinExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<FunctionMap, ExtractionError> {
        if !request.path.is_file() {
            return Err(ExtractionError::MissingFile(request.path.clone()));
        }

        // Allow tests to feed synthetic JSON via env to avoid needing rizin installed.
        let body = if let Some(fake_json) = std::env::var_os("ASMDB_RIZIN_FAKE_JSON") {
            fs::read_to_string(fake_json).map_err(|e| {
                ExtractionError::Backend(format!("failed to read ASMDB_RIZIN_FAKE_JSON: {e}"))
            })?
        } else {
            let script = format!("e anal.depth={};aa;pdfj @@F", request.depth);
            run_rizin(&self.rizin_path(), &request.path, &script).await?
        };

        parse_functions(&body, request.use_symbol)
    }

    fn name(&self) -> &'static str {
        "rizin"
    }

    fn description(&self) -> &'static str {
        "Runs rizin per object file (binary from --rizin, RIZIN_BIN or PATH)"
    }

    fn tool_status(&self) -> Option<ToolStatus> {
        Some(ToolStatus::from_version(self.rizin_path(), self.version()))
    }
}

fn resolve_rizin_path() -> PathBuf {
    std::env::var_os("RIZIN_BIN").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("rizin"))
}

/// Run rizin with `script` against `binary` and capture stdout.
///
/// The child is killed if this future is dropped before it exits.
async fn run_rizin(rizin_bin: &Path, binary: &Path, script: &str) -> Result<String, ExtractionError> {
    let output = Command::new(rizin_bin)
        .args(["-2", "-q0", "-c", script])
        .arg(binary)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ExtractionError::Backend(format!("failed to spawn rizin: {e}")))?;
    if !output.status.success() {
        return Err(ExtractionError::Backend(format!("rizin exited with {}", output.status)));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn version_string(rizin_bin: &Path) -> Result<String, String> {
    if let Some(fake) = std::env::var_os("ASMDB_RIZIN_FAKE_VERSION") {
        return Ok(fake.to_string_lossy().to_string());
    }
    let output = std::process::Command::new(rizin_bin)
        .arg("-v")
        .output()
        .map_err(|e| format!("failed to spawn rizin: {e}"))?;
    if !output.status.success() {
        return Err(format!("rizin -v exited with {}", output.status));
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    match stdout.lines().next() {
        Some(first) if !first.trim().is_empty() => Ok(first.trim().to_string()),
        _ => Err("rizin -v produced no output".to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct RizinFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ops: Vec<RizinOp>,
}

#[derive(Debug, Deserialize)]
struct RizinOp {
    #[serde(default)]
    disasm: Option<String>,
    #[serde(default)]
    opcode: Option<String>,
    #[serde(default)]
    #[serde(rename = "type")]
    typ: Option<String>,
}

impl RizinOp {
    fn text(&self) -> Option<&str> {
        if self.typ.as_deref() == Some("invalid") {
            return None;
        }
        self.disasm.as_deref().or(self.opcode.as_deref())
    }
}

/// Parse a stream of `pdfj` documents (one per function, NUL/newline separated).
fn parse_functions(body: &str, use_symbol: bool) -> Result<FunctionMap, ExtractionError> {
    let cleaned = body.replace('\0', "\n");
    let stream = serde_json::Deserializer::from_str(&cleaned).into_iter::<RizinFunction>();

    let mut out = FunctionMap::new();
    for func in stream {
        let func = func
            .map_err(|e| ExtractionError::Backend(format!("failed to parse rizin pdfj JSON: {e}")))?;
        let Some(name) = func.name else {
            continue;
        };
        if use_symbol && name.starts_with(AUTO_NAMED_PREFIX) {
            continue;
        }

        let lines: Vec<&str> = func.ops.iter().filter_map(RizinOp::text).collect();
        let filtered_instructions = normalize_all(lines.iter().copied());
        out.insert(name, ExtractedFunction::new(lines.join("\n"), filtered_instructions));
    }
    Ok(out)
}
