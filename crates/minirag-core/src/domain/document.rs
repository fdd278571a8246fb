use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
    /// blake3 of the content; changes whenever the file does.
    pub content_hash: String,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, content: String) -> Self {
        let content_hash = blake3::hash(content.as_bytes()).to_hex().to_string();
        Self {
            path: path.into(),
            content,
            content_hash,
            modified_at: None,
        }
    }

    #[must_use]
    pub const fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    /// File name used to label sources, falling back to the full path.
    pub fn name(&self) -> String {
        file_name(&self.path)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().to_string(),
        |n| n.to_string_lossy().to_string(),
    )
}
