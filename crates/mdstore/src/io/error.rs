//! Error types for store operations

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Lock could not be acquired before the deadline
    #[error("Failed to acquire lock on {path} after {waited:?}")]
    LockTimeout { path: PathBuf, waited: Duration },

    /// Document content is not valid YAML for the requested shape
    #[error("YAML parse error in {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_saphyr::Error,
    },

    /// Frontmatter block is not valid YAML for the requested shape
    #[error("Frontmatter parse error: {source}")]
    FrontmatterParse { source: serde_saphyr::Error },

    /// Value could not be rendered as YAML
    #[error("YAML serialize error: {source}")]
    YamlSerialize { source: serde_saphyr::ser::Error },

    /// Configuration file could not be parsed
    #[error("Config parse error in {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Timestamp is neither RFC3339 nor RFC3339 with fractional seconds
    #[error("unable to parse time {value:?}: expected RFC3339 or RFC3339Nano format")]
    InvalidTimestamp { value: String },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when the error is a lock timeout, which callers may retry.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. })
    }
}
