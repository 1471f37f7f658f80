//! Core data model for the function dataset.
//!
//! - `FileIdentity`: the `(project, compiler, optimization, file_name)` tuple
//!   derived from an object file's location under the dataset root.
//! - `ExtractedFunction` / `FunctionMap`: what an extraction backend returns.
//! - `FunctionRecord` / `FilteredFunction`: the two persisted rows.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Number of trailing path segments that identify an object file.
pub const IDENTITY_SEGMENTS: usize = 4;

/// Identity of an object file inside the dataset tree.
///
/// Files live at `root/<project>/<compiler>/<optimization>/<file>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileIdentity {
    pub project: String,
    pub compiler: String,
    pub optimization: String,
    pub file_name: String,
}

impl FileIdentity {
    pub fn new(
        project: impl Into<String>,
        compiler: impl Into<String>,
        optimization: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            compiler: compiler.into(),
            optimization: optimization.into(),
            file_name: file_name.into(),
        }
    }

    /// Derive the identity of `path` from its last four segments below `root`.
    ///
    /// Returns `None` when fewer than four segments remain below the root.
    /// Callers treat `None` as "drop silently": such files never produce rows.
    /// A path outside `root` is judged on its own segments.
    pub fn from_path(root: &Path, path: &Path) -> Option<Self> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let segments: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        if segments.len() < IDENTITY_SEGMENTS {
            return None;
        }
        let tail = &segments[segments.len() - IDENTITY_SEGMENTS..];
        Some(Self::new(tail[0].clone(), tail[1].clone(), tail[2].clone(), tail[3].clone()))
    }

    /// Leading segments below `root` that `from_path` discards.
    ///
    /// `root/batch1/proj/gcc/O2/a.o` yields `batch1`. Such files get an identity
    /// whose rebuilt path differs from their real one, so the dedup filter never
    /// recognizes them and every build extracts them again.
    pub fn dropped_prefix(root: &Path, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let segments: Vec<&std::ffi::OsStr> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s),
                _ => None,
            })
            .collect();
        if segments.len() <= IDENTITY_SEGMENTS {
            return None;
        }
        Some(segments[..segments.len() - IDENTITY_SEGMENTS].iter().copied().collect())
    }

    /// Rebuild the absolute location of this file under `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        root.join(&self.project).join(&self.compiler).join(&self.optimization).join(&self.file_name)
    }
}

/// One function as returned by an extraction backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFunction {
    /// Raw disassembly text.
    pub asm: String,
    /// Normalized instruction tokens, one per instruction.
    pub filtered_instructions: Vec<String>,
}

impl ExtractedFunction {
    pub fn new(asm: impl Into<String>, filtered_instructions: Vec<String>) -> Self {
        Self { asm: asm.into(), filtered_instructions }
    }
}

/// Function name to extracted function, for a single object file.
pub type FunctionMap = BTreeMap<String, ExtractedFunction>;

/// Row of the `functions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub id: i64,
    #[serde(flatten)]
    pub identity: FileIdentity,
    pub function_name: String,
    pub asm: String,
    pub num_instructions: i64,
}

/// Row of the `filtered_functions` table; `id` matches its `FunctionRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilteredFunction {
    pub id: i64,
    pub instruction_ids: Vec<i64>,
}

/// A function ready to be inserted: everything except the surrogate id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFunction {
    pub identity: FileIdentity,
    pub function_name: String,
    pub asm: String,
    pub instruction_ids: Vec<i64>,
}

impl NewFunction {
    /// Instruction count persisted alongside the row; always the filtered length.
    pub fn num_instructions(&self) -> i64 {
        self.instruction_ids.len() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_uses_last_four_segments_below_root() {
        let root = Path::new("/data/bins");
        let id = FileIdentity::from_path(root, Path::new("/data/bins/proj/gcc/O2/a.o")).unwrap();
        assert_eq!(id, FileIdentity::new("proj", "gcc", "O2", "a.o"));
        assert_eq!(id.to_path(root), PathBuf::from("/data/bins/proj/gcc/O2/a.o"));
    }

    #[test]
    fn identity_rejects_shallow_paths() {
        let root = Path::new("/data/bins");
        assert!(FileIdentity::from_path(root, Path::new("/data/bins/gcc/O2/a.o")).is_none());
        assert!(FileIdentity::from_path(root, Path::new("/data/bins/a.o")).is_none());
    }

    #[test]
    fn identity_takes_tail_of_deeper_paths() {
        let root = Path::new("/r");
        let id = FileIdentity::from_path(root, Path::new("/r/extra/proj/clang/O0/b.o")).unwrap();
        assert_eq!(id, FileIdentity::new("proj", "clang", "O0", "b.o"));
    }

    #[test]
    fn dropped_prefix_names_segments_above_the_identity() {
        let root = Path::new("/r");
        assert_eq!(
            FileIdentity::dropped_prefix(root, Path::new("/r/batch1/nightly/proj/gcc/O2/a.o")),
            Some(PathBuf::from("batch1/nightly"))
        );
        assert_eq!(FileIdentity::dropped_prefix(root, Path::new("/r/proj/gcc/O2/a.o")), None);
        assert_eq!(FileIdentity::dropped_prefix(root, Path::new("/r/gcc/O2/a.o")), None);
    }

    #[test]
    fn identity_for_relative_path_outside_root() {
        let id = FileIdentity::from_path(Path::new("/elsewhere"), Path::new("p/c/o/f.o")).unwrap();
        assert_eq!(id.file_name, "f.o");
        assert!(FileIdentity::from_path(Path::new("/elsewhere"), Path::new("c/o/f.o")).is_none());
    }
}
