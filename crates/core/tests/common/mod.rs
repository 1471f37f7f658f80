#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use asmdb_core::model::{ExtractedFunction, FunctionMap};
use asmdb_core::services::extraction::{ExtractionAdapter, ExtractionError, ExtractionRequest};
use asmdb_core::vocab::Vocabulary;

/// Create empty object files at the given paths below `root`.
pub fn make_tree(root: &Path, files: &[&str]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|rel| {
            let path = root.join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"\x7fELF").unwrap();
            path
        })
        .collect()
}

pub fn test_vocab() -> Arc<Vocabulary> {
    let mut ids = HashMap::new();
    ids.insert("X_UNK".to_string(), 1);
    ids.insert("X_push_rbp".to_string(), 2);
    ids.insert("X_mov_rbp_rsp".to_string(), 3);
    ids.insert("X_ret".to_string(), 4);
    Arc::new(Vocabulary::from_map(ids))
}

/// `foo` with three instructions, plus one extra function per digit in the file stem.
pub fn default_functions(path: &Path) -> FunctionMap {
    let mut map = FunctionMap::new();
    map.insert(
        "foo".to_string(),
        ExtractedFunction::new(
            "push rbp\nmov rbp, rsp\nret",
            vec!["X_push_rbp".into(), "X_mov_rbp_rsp".into(), "X_ret".into()],
        ),
    );
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    for digit in stem.chars().filter(|c| c.is_ascii_digit()) {
        map.insert(
            format!("helper_{digit}"),
            ExtractedFunction::new("xor eax, eax\nret", vec!["X_xor_eax_eax".into(), "X_ret".into()]),
        );
    }
    map
}

/// In-test extractor: answers from `default_functions`, with per-file hangs/failures.
#[derive(Default)]
pub struct ScriptedExtractor {
    hang: HashSet<String>,
    fail: HashSet<String>,
    pub calls: Mutex<Vec<PathBuf>>,
    pub releases: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never answer for files with this name.
    pub fn hang_on(mut self, file_name: &str) -> Self {
        self.hang.insert(file_name.to_string());
        self
    }

    /// Fail for files with this name.
    pub fn fail_on(mut self, file_name: &str) -> Self {
        self.fail.insert(file_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionAdapter for ScriptedExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<FunctionMap, ExtractionError> {
        self.calls.lock().unwrap().push(request.path.clone());
        let name = request.path.file_name().unwrap().to_string_lossy().to_string();
        if self.hang.contains(&name) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail.contains(&name) {
            return Err(ExtractionError::Backend(format!("cannot analyze {name}")));
        }
        // Yield so concurrent workers actually interleave.
        tokio::task::yield_now().await;
        Ok(default_functions(&request.path))
    }

    fn release(&self, _request: &ExtractionRequest) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
