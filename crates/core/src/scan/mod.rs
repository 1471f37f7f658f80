//! Candidate discovery: walk the dataset root for object files.

pub mod dedup;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use walkdir::WalkDir;

pub use dedup::{filter_ingested, remove_ingested, DedupOutcome};

/// Default suffix of candidate object files.
pub const OBJECT_SUFFIX: &str = ".o";

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan root does not exist or is not a directory: {0}")]
    MissingRoot(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Walk { path: PathBuf, source: walkdir::Error },
}

/// Recursively collect every regular file under `root` whose name ends with `suffix`.
///
/// Symlinked files and directories are followed; a link loop counts as an
/// unreadable entry. The first unreadable entry aborts the scan. Order follows
/// directory listing order and is not otherwise specified.
pub fn scan_object_files(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, ScanError> {
    walk(root, suffix, false)
}

/// Like [`scan_object_files`], but unreadable subtrees are logged and skipped.
pub fn scan_object_files_lenient(root: &Path, suffix: &str) -> Result<Vec<PathBuf>, ScanError> {
    walk(root, suffix, true)
}

fn walk(root: &Path, suffix: &str, lenient: bool) -> Result<Vec<PathBuf>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                if lenient {
                    warn!(path = %path.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
                return Err(ScanError::Walk { path, source: err });
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(suffix) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_object_files_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("proj/gcc/O2")).unwrap();
        fs::create_dir_all(root.join("proj/clang/O0/nested")).unwrap();
        fs::write(root.join("proj/gcc/O2/a.o"), b"").unwrap();
        fs::write(root.join("proj/clang/O0/nested/b.o"), b"").unwrap();
        fs::write(root.join("proj/gcc/O2/a.c"), b"").unwrap();
        fs::write(root.join("top.o"), b"").unwrap();

        let mut found = scan_object_files(root, OBJECT_SUFFIX).unwrap();
        found.sort();
        let mut expected = vec![
            root.join("proj/clang/O0/nested/b.o"),
            root.join("proj/gcc/O2/a.o"),
            root.join("top.o"),
        ];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_objects_and_directories_are_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        fs::create_dir_all(store.join("O3")).unwrap();
        fs::write(store.join("real.o"), b"").unwrap();
        fs::write(store.join("O3/c.o"), b"").unwrap();

        let root = dir.path().join("root");
        fs::create_dir_all(root.join("proj/gcc/O2")).unwrap();
        symlink(store.join("real.o"), root.join("proj/gcc/O2/a.o")).unwrap();
        symlink(store.join("O3"), root.join("proj/gcc/O3")).unwrap();

        let mut found = scan_object_files(&root, OBJECT_SUFFIX).unwrap();
        found.sort();
        assert_eq!(found, vec![root.join("proj/gcc/O2/a.o"), root.join("proj/gcc/O3/c.o")]);
    }

    #[cfg(unix)]
    #[test]
    fn link_loops_fail_strict_scan_and_are_skipped_leniently() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("proj/gcc/O2")).unwrap();
        fs::write(root.join("proj/gcc/O2/a.o"), b"").unwrap();
        symlink(root.join("proj"), root.join("proj/gcc/loop")).unwrap();

        assert!(matches!(
            scan_object_files(root, OBJECT_SUFFIX),
            Err(ScanError::Walk { .. })
        ));
        let found = scan_object_files_lenient(root, OBJECT_SUFFIX).unwrap();
        assert_eq!(found, vec![root.join("proj/gcc/O2/a.o")]);
    }

    #[test]
    fn directories_named_like_objects_are_not_candidates() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("weird.o")).unwrap();
        assert!(scan_object_files(dir.path(), OBJECT_SUFFIX).unwrap().is_empty());
    }

    #[test]
    fn empty_root_yields_nothing_and_missing_root_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_object_files(dir.path(), OBJECT_SUFFIX).unwrap().is_empty());
        let missing = dir.path().join("missing");
        assert!(matches!(
            scan_object_files_lenient(&missing, OBJECT_SUFFIX),
            Err(ScanError::MissingRoot(_))
        ));
    }
}
