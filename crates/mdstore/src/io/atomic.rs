//! Atomic file replacement and directory creation
//!
//! New content is staged in a uniquely named temporary file next to the
//! target, synced, and renamed over the target. Rename within a directory
//! stays on one filesystem, so readers see either the old bytes or the new
//! bytes and never a truncated file.

use crate::io::error::StoreError;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Prefix of staging files created next to the target.
pub const TEMP_PREFIX: &str = ".tmp-";

/// Create `path` and all missing ancestors.
///
/// Succeeds without doing anything if the directory already exists.
///
/// # Errors
///
/// Returns `StoreError::Io` when the directory cannot be created, including
/// when a non-directory file occupies the path.
pub fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))
}

/// Atomically replace the contents of `path` with `data`
///
/// Creates the parent directory if needed, writes `data` to a temporary
/// file in that directory, syncs it, then renames it onto `path`.
///
/// # Errors
///
/// - Directory creation failure aborts before any temp file exists.
/// - Write or sync failure removes the temp file; `path` is untouched.
/// - Rename failure removes the temp file (best effort); `path` is untouched.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let dir = parent_dir(path);
    ensure_dir(dir)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .map_err(|e| StoreError::io(dir, e))?;

    // Dropping `tmp` on any early return deletes the staging file.
    tmp.write_all(data)
        .map_err(|e| StoreError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StoreError::io(tmp.path(), e))?;

    let tmp_path = tmp.path().to_path_buf();
    tmp.persist(path).map_err(|e| StoreError::io(path, e.error))?;

    debug!(path = %path.display(), tmp = %tmp_path.display(), bytes = data.len(), "atomic replace");
    Ok(())
}

/// Directory that holds `path`; bare file names resolve to the current directory.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect()
    }

    #[test]
    fn test_atomic_write_basic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.txt");

        atomic_write(&path, b"hello world").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello world");
    }

    #[test]
    fn test_atomic_write_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.txt");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("c").join("test.txt");

        atomic_write(&path, b"nested").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "nested");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.yaml");

        for i in 0..5 {
            atomic_write(&path, format!("rev: {i}\n").as_bytes()).unwrap();
        }

        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_atomic_write_empty_payload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.txt");

        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"");
    }

    #[test]
    fn test_atomic_write_rename_failure_keeps_target_dir_clean() {
        let temp_dir = TempDir::new().unwrap();
        // A non-empty directory at the target path cannot be replaced by a file.
        let path = temp_dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("child"), b"x").unwrap();

        let result = atomic_write(&path, b"data");

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(path.join("child").exists());
        assert!(leftover_temp_files(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_atomic_write_parent_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a dir").unwrap();

        let result = atomic_write(&blocker.join("doc.txt"), b"data");

        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(fs::read(&blocker).unwrap(), b"not a dir");
    }

    #[test]
    fn test_ensure_dir_create() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("newdir");

        ensure_dir(&path).unwrap();

        assert!(path.is_dir());
    }

    #[test]
    fn test_ensure_dir_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("newdir");

        ensure_dir(&path).unwrap();
        ensure_dir(&path).unwrap();

        assert!(path.is_dir());
    }

    #[test]
    fn test_ensure_dir_nested() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a").join("b").join("c");

        ensure_dir(&path).unwrap();

        assert!(path.is_dir());
    }

    #[test]
    fn test_ensure_dir_file_in_the_way() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file");
        fs::write(&path, b"x").unwrap();

        assert!(matches!(ensure_dir(&path), Err(StoreError::Io { .. })));
    }

    #[test]
    fn test_parent_dir_of_bare_file_name() {
        assert_eq!(parent_dir(Path::new("doc.yaml")), Path::new("."));
        assert_eq!(parent_dir(Path::new("a/doc.yaml")), Path::new("a"));
    }
}
