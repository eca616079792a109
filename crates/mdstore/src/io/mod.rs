//! Crash-safe file I/O for structured documents
//!
//! This module provides the storage primitives shared by every document kind:
//!
//! - **Atomic replace**: content is staged in a temp file and renamed into place
//! - **Directory locking**: cross-process mutual exclusion on `<dir>/.lock`
//! - **YAML documents**: read-or-default, atomic write, locked append/update
//!
//! # Example
//!
//! ```rust,no_run
//! use mdstore::io::{append_yaml, read_yaml};
//! use serde::{Deserialize, Serialize};
//! use std::path::Path;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Entry {
//!     title: String,
//!     done: bool,
//! }
//!
//! let path = Path::new("/home/user/.notes/todo.yaml");
//! append_yaml(path, Entry { title: "ship it".to_string(), done: false }).unwrap();
//!
//! let entries: Vec<Entry> = read_yaml(path).unwrap();
//! println!("{} entries", entries.len());
//! ```

pub mod atomic;
pub mod error;
pub mod lock;
pub mod yaml;

// Re-export primary API
pub use atomic::{atomic_write, ensure_dir};
pub use error::StoreError;
pub use lock::{
    ExclusiveLock, FlockLock, LockGuard, MarkerFileLock, PlatformLock, with_lock, with_lock_config,
};
pub use yaml::{
    append_yaml, append_yaml_with, read_yaml, try_read_yaml, update_yaml, update_yaml_with,
    write_yaml,
};
