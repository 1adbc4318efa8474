//! Image source descriptions

use bytes::Bytes;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where an image comes from
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSpec {
    /// http(s) URL supplied by the caller
    Remote(String),
    /// File on the service's filesystem
    Local(PathBuf),
    /// Encoded image bytes already in memory (uploads)
    InMemory(Bytes),
}

impl SourceSpec {
    /// An explicit URL override wins; otherwise the configured local default
    pub fn override_or_default(override_url: Option<&str>, default_path: &Path) -> Self {
        match non_blank(override_url) {
            Some(url) => SourceSpec::Remote(url.to_string()),
            None => SourceSpec::Local(default_path.to_path_buf()),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, SourceSpec::Remote(_))
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceSpec::Remote(url) => write!(f, "url {}", truncate(url, 120)),
            SourceSpec::Local(path) => write!(f, "local {}", path.display()),
            SourceSpec::InMemory(bytes) => write!(f, "in-memory ({} bytes)", bytes.len()),
        }
    }
}

/// Trimmed value, or `None` for missing and whitespace-only strings
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Shorten long values (URLs) for log output
pub fn truncate(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
