//! Storage primitives for YAML documents and markdown files with frontmatter
//!
//! Multiple independent processes on one machine can read and update the same
//! documents safely:
//!
//! - Every write is an atomic replace, so a reader never sees a torn file
//! - Read-modify-write sequences (append, update) are serialized across
//!   processes with a lock on the document's directory
//! - A missing document reads as the empty/default value
//!
//! ```rust,no_run
//! use mdstore::frontmatter::{read_markdown, write_markdown};
//! use serde::{Deserialize, Serialize};
//! use std::path::Path;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct Note {
//!     title: String,
//!     created: String,
//! }
//!
//! let path = Path::new("notes/hello-world.md");
//! let note = Note {
//!     title: "Hello world".to_string(),
//!     created: mdstore::time::format_time(chrono::Utc::now()),
//! };
//! write_markdown(path, &note, "First note.\n")?;
//!
//! let doc = read_markdown::<Note>(path)?.expect("just written");
//! assert_eq!(doc.body, "First note.\n");
//! # Ok::<(), mdstore::StoreError>(())
//! ```

pub mod config;
pub mod frontmatter;
pub mod io;
pub mod logging;
pub mod text;
pub mod time;

pub use config::{LockConfig, StoreConfig};
pub use frontmatter::{MarkdownDoc, join_frontmatter, parse_frontmatter, split_frontmatter};
pub use io::{
    StoreError, append_yaml, atomic_write, ensure_dir, read_yaml, update_yaml, with_lock,
    write_yaml,
};
