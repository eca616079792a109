//! YAML document read, write, append and update
//!
//! Writes go through [`atomic_write`], so readers never need the lock.
//! Append and update are read-modify-write sequences and always run under the
//! lock of the document's parent directory.

use crate::config::LockConfig;
use crate::io::atomic::{atomic_write, parent_dir};
use crate::io::error::StoreError;
use crate::io::lock::{ExclusiveLock, PlatformLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read a YAML document, returning `None` if the file does not exist.
///
/// An empty or whitespace-only file reads as `T::default()`.
///
/// # Errors
///
/// Returns `StoreError::Io` for read failures other than absence, and
/// `StoreError::YamlParse` if the content does not match `T`.
pub fn try_read_yaml<T>(path: &Path) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(Some(T::default()));
    }

    serde_saphyr::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Read a YAML document, or `T::default()` if the file does not exist.
///
/// A missing document is not an error, so callers can write
/// `let items: Vec<Item> = read_yaml(&path)?;` without checking existence.
pub fn read_yaml<T>(path: &Path) -> Result<T, StoreError>
where
    T: DeserializeOwned + Default,
{
    Ok(try_read_yaml(path)?.unwrap_or_default())
}

/// Serialize `value` as YAML and atomically replace `path` with it.
pub fn write_yaml<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize,
{
    let content = to_yaml(value)?;
    atomic_write(path, content.as_bytes())
}

pub(crate) fn to_yaml<T>(value: &T) -> Result<String, StoreError>
where
    T: Serialize,
{
    serde_saphyr::to_string(value).map_err(|source| StoreError::YamlSerialize { source })
}

/// Append `item` to the YAML sequence stored at `path`
///
/// A missing document starts as an empty sequence. The read-append-write runs
/// under the directory lock, so concurrent appends from any process are all
/// preserved, in the order they acquired the lock.
///
/// # Errors
///
/// Returns `StoreError::LockTimeout` if the lock could not be acquired, or
/// any error from reading, parsing, serializing, or writing the document.
///
/// # Deadlocks
///
/// Safe to call inside [`with_lock`] on the document's directory from the
/// same thread: the held lock is re-entered rather than waited on.
///
/// [`with_lock`]: crate::io::with_lock
pub fn append_yaml<T>(path: &Path, item: T) -> Result<(), StoreError>
where
    T: Serialize + DeserializeOwned,
{
    append_yaml_with(path, item, &LockConfig::from_env())
}

/// [`append_yaml`] with explicit lock timing.
pub fn append_yaml_with<T>(path: &Path, item: T, config: &LockConfig) -> Result<(), StoreError>
where
    T: Serialize + DeserializeOwned,
{
    update_yaml_with(path, config, |items: &mut Vec<T>| items.push(item))
}

/// Locked read-modify-write of the YAML document at `path`
///
/// Reads the document (or `T::default()` if missing), applies `update`, and
/// writes the result back atomically, all while holding the lock on the
/// document's parent directory. Returns whatever `update` returns.
///
/// # Deadlocks
///
/// Re-enters the directory lock when the calling thread already holds it.
/// `update` must not wait on another thread that locks the same directory.
pub fn update_yaml<T, R, F>(path: &Path, update: F) -> Result<R, StoreError>
where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce(&mut T) -> R,
{
    update_yaml_with(path, &LockConfig::from_env(), update)
}

/// [`update_yaml`] with explicit lock timing.
pub fn update_yaml_with<T, R, F>(path: &Path, config: &LockConfig, update: F) -> Result<R, StoreError>
where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce(&mut T) -> R,
{
    PlatformLock::new(config).with_lock(parent_dir(path), || {
        let mut document: T = read_yaml(path)?;
        let outcome = update(&mut document);
        write_yaml(path, &document)?;
        Ok(outcome)
    })
}
