//! Markdown frontmatter splitting and rendering.
//!
//! A document with frontmatter looks like:
//!
//! ```text
//! ---
//! title: Hello
//! tags: [a, b]
//! ---
//! Body text.
//! ```
//!
//! Absent or unterminated frontmatter is never an error: the whole text is
//! the body and the metadata is empty.

use crate::io::atomic::atomic_write;
use crate::io::error::StoreError;
use crate::io::yaml::to_yaml;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Delimiter line that opens and closes a frontmatter block.
pub const DELIMITER: &str = "---";

/// A markdown document split into typed metadata and body text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkdownDoc<T> {
    pub meta: T,
    pub body: String,
}

/// Split `content` into `(yaml, body)`.
///
/// The opening delimiter must be the first non-blank line; the block ends at
/// the next line that is exactly `---`. The yaml excludes both delimiter
/// lines and its final line break. The body is everything after the closing
/// delimiter line, whose `\n` or `\r\n` is consumed.
///
/// Returns `("", content)` when either delimiter is missing.
pub fn split_frontmatter(content: &str) -> (&str, &str) {
    let Some(rest) = strip_line(content.trim_start(), DELIMITER) else {
        return ("", content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if strip_line(line, DELIMITER).is_some() || line == DELIMITER {
            let yaml = trim_line_break(&rest[..offset]);
            let body = &rest[offset + line.len()..];
            return (yaml, body);
        }
        offset += line.len();
    }

    ("", content)
}

/// If `text` starts with the line `expected` followed by a line break, return
/// what follows the break.
fn strip_line<'a>(text: &'a str, expected: &str) -> Option<&'a str> {
    let after = text.strip_prefix(expected)?;
    after
        .strip_prefix('\n')
        .or_else(|| after.strip_prefix("\r\n"))
}

fn trim_line_break(text: &str) -> &str {
    text.strip_suffix('\n')
        .map(|t| t.strip_suffix('\r').unwrap_or(t))
        .unwrap_or(text)
}

/// Render `meta` as YAML between delimiters, followed by `body` verbatim.
pub fn join_frontmatter<T>(meta: &T, body: &str) -> Result<String, StoreError>
where
    T: Serialize,
{
    let yaml = to_yaml(meta)?;

    let mut out = String::with_capacity(yaml.len() + body.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.is_empty() && !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(body);
    Ok(out)
}

/// Split `content` and deserialize its frontmatter.
///
/// Missing or empty frontmatter yields `T::default()`.
///
/// # Errors
///
/// Returns `StoreError::FrontmatterParse` if the block is not valid YAML for `T`.
pub fn parse_frontmatter<T>(content: &str) -> Result<(T, &str), StoreError>
where
    T: DeserializeOwned + Default,
{
    let (yaml, body) = split_frontmatter(content);
    let meta = deserialize_meta(yaml).map_err(|source| StoreError::FrontmatterParse { source })?;
    Ok((meta, body))
}

fn deserialize_meta<T>(yaml: &str) -> Result<T, serde_saphyr::Error>
where
    T: DeserializeOwned + Default,
{
    if yaml.trim().is_empty() {
        return Ok(T::default());
    }
    serde_saphyr::from_str(yaml)
}

/// Read a markdown file with frontmatter; `None` if the file does not exist.
pub fn read_markdown<T>(path: &Path) -> Result<Option<MarkdownDoc<T>>, StoreError>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let (yaml, body) = split_frontmatter(&content);
    let meta = deserialize_meta(yaml).map_err(|source| StoreError::YamlParse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(MarkdownDoc {
        meta,
        body: body.to_string(),
    }))
}

/// Render `meta` and `body` and atomically replace `path` with the result.
pub fn write_markdown<T>(path: &Path, meta: &T, body: &str) -> Result<(), StoreError>
where
    T: Serialize,
{
    let content = join_frontmatter(meta, body)?;
    atomic_write(path, content.as_bytes())
}
