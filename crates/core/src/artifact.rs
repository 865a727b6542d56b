//! Source artifacts — the unit of exchange between generation steps
//! and the filesystem.
//!
//! Content is immutable text, replaced wholesale on each repair trial
//! (never patched in place). Each trial is therefore a full snapshot,
//! which is what makes the repair loops retry-safe.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A named piece of generated source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceArtifact {
    /// File name only, no directory component.
    pub file_name: String,

    /// Full source text.
    pub content: String,
}

impl SourceArtifact {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }

    /// Snapshot with the same file name and new content.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            file_name: self.file_name.clone(),
            content: content.into(),
        }
    }

    /// The path this artifact occupies under `dir`.
    pub fn path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.file_name)
    }

    /// Write the artifact under `dir`, creating the directory if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = self.path(dir);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }

    /// Read an artifact back from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { file_name, content })
    }

    /// Copy the saved artifact from `src_dir` to `dst_dir`.
    pub fn copy(&self, src_dir: &Path, dst_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dst_dir)?;
        let dst = self.path(dst_dir);
        std::fs::copy(self.path(src_dir), &dst)?;
        Ok(dst)
    }
}
