//! Data model shared by the scanners and operations.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::normalize::PathNormalizer;

/// A search term matched case-insensitively against names and values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchTerm {
    text: String,
    #[serde(skip)]
    folded: String,
}

impl SearchTerm {
    /// Create a search term. Surrounding whitespace is trimmed; an empty
    /// term is rejected.
    pub fn new(text: impl AsRef<str>) -> Result<Self, ConfigError> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(ConfigError::EmptySearchTerm);
        }
        Ok(Self {
            text: text.to_string(),
            folded: text.to_lowercase(),
        })
    }

    /// The term as given.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether `name` starts with this term.
    pub fn matches_prefix(&self, name: &str) -> bool {
        name.to_lowercase().starts_with(&self.folded)
    }

    /// Whether `value` contains this term.
    pub fn contained_in(&self, value: &str) -> bool {
        value.to_lowercase().contains(&self.folded)
    }
}

impl std::fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Hiding type of a rule target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A registry key or a folder.
    FolderOrKey,
    /// A registry value or a file.
    FileOrValue,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FolderOrKey => write!(f, "FolderOrKey"),
            Self::FileOrValue => write!(f, "FileOrValue"),
        }
    }
}

/// A discovered filesystem or registry path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePath {
    /// Absolute path as found.
    pub path: String,
    /// Hiding type.
    pub kind: EntryKind,
}

impl CandidatePath {
    /// A registry key or folder.
    pub fn folder_or_key(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::FolderOrKey,
        }
    }

    /// A registry value or file.
    pub fn file_or_value(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::FileOrValue,
        }
    }
}

/// A candidate path after placeholder substitution, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRuleEntry {
    /// Normalized path.
    pub path: String,
    /// Hiding type.
    pub kind: EntryKind,
    /// Free-text comment naming the generating tool.
    pub comment: String,
}

impl NormalizedRuleEntry {
    /// Normalize a candidate into a rule entry.
    pub fn from_candidate(
        candidate: &CandidatePath,
        normalizer: &PathNormalizer,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            path: normalizer.normalize(&candidate.path),
            kind: candidate.kind,
            comment: comment.into(),
        }
    }
}

/// One path entry of a cleanup target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetPath {
    /// Declared path, possibly containing `%NAME%` placeholders.
    pub path: String,
    /// Files last modified at least this many days ago are removed.
    pub max_age_days: u64,
}

/// A named group of cleanup paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupTarget {
    /// Target name.
    pub name: String,
    /// Path entries.
    pub paths: Vec<TargetPath>,
}

impl CleanupTarget {
    /// Create an empty target.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: Vec::new(),
        }
    }

    /// Add a path entry.
    pub fn with_path(mut self, path: impl Into<String>, max_age_days: u64) -> Self {
        self.paths.push(TargetPath {
            path: path.into(),
            max_age_days,
        });
        self
    }
}

/// A file selected for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedFileRecord {
    /// Path of the file.
    pub path: PathBuf,
    /// Size in bytes at scan time.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
    /// Whether the file was actually removed.
    pub deleted: bool,
    /// Failure message if removal was attempted and failed.
    pub error: Option<String>,
}

impl DeletedFileRecord {
    /// A record for a file that has not been processed yet.
    pub fn pending(path: impl Into<PathBuf>, size: u64, modified: SystemTime) -> Self {
        Self {
            path: path.into(),
            size,
            modified,
            deleted: false,
            error: None,
        }
    }

    /// Whether deletion was attempted and failed.
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}
