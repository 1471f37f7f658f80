//! Instruction vocabulary: normalized token -> integer id.
//!
//! The table is precomputed elsewhere and shipped as a JSON object
//! (`{"X_mov_rax_rbx": 12, ...}`). It is loaded once and shared read-only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Token used for instructions missing from the vocabulary.
pub const UNKNOWN_TOKEN: &str = "X_UNK";

/// Id used for unknown tokens when the vocabulary has no `X_UNK` entry.
pub const FALLBACK_UNKNOWN_ID: i64 = 0;

/// Default location of the vocabulary file, relative to the working directory.
pub const DEFAULT_VOCAB_PATH: &str = "data/i2v/word2id.json";

#[derive(Debug, Error)]
pub enum VocabError {
    #[error("Failed to read vocabulary at {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse vocabulary at {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

/// Maps an ordered token sequence to an ordered id sequence.
///
/// Implementations are pure: the same input always yields the same ids.
pub trait InstructionConverter: Send + Sync {
    fn convert(&self, tokens: &[String]) -> Vec<i64>;
}

/// JSON-backed vocabulary table.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    ids: HashMap<String, i64>,
    unknown_id: i64,
}

impl Vocabulary {
    pub fn from_map(ids: HashMap<String, i64>) -> Self {
        let unknown_id = ids.get(UNKNOWN_TOKEN).copied().unwrap_or(FALLBACK_UNKNOWN_ID);
        Self { ids, unknown_id }
    }

    pub fn from_json_str(body: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_map(serde_json::from_str(body)?))
    }

    /// Load the vocabulary from a JSON file.
    pub fn load(path: &Path) -> Result<Self, VocabError> {
        let body = std::fs::read_to_string(path)
            .map_err(|source| VocabError::Read { path: path.to_path_buf(), source })?;
        Self::from_json_str(&body)
            .map_err(|source| VocabError::Parse { path: path.to_path_buf(), source })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id_of(&self, token: &str) -> i64 {
        self.ids.get(token).copied().unwrap_or(self.unknown_id)
    }
}

impl InstructionConverter for Vocabulary {
    fn convert(&self, tokens: &[String]) -> Vec<i64> {
        tokens.iter().map(|t| self.id_of(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn converts_in_order_and_maps_unknown_to_unk_entry() {
        let vocab =
            Vocabulary::from_json_str(r#"{"X_UNK": 1, "X_push_rbp": 7, "X_ret": 9}"#).unwrap();
        let ids = vocab.convert(&tokens(&["X_ret", "X_push_rbp", "X_nop_weird"]));
        assert_eq!(ids, vec![9, 7, 1]);
    }

    #[test]
    fn unknown_falls_back_to_zero_without_unk_entry() {
        let vocab = Vocabulary::from_json_str(r#"{"X_ret": 3}"#).unwrap();
        assert_eq!(vocab.convert(&tokens(&["X_call_IMM"])), vec![FALLBACK_UNKNOWN_ID]);
        assert_eq!(vocab.len(), 1);
    }

    #[test]
    fn load_reports_missing_file_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(Vocabulary::load(&missing), Err(VocabError::Read { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[1, 2").unwrap();
        assert!(matches!(Vocabulary::load(&bad), Err(VocabError::Parse { .. })));
    }
}
