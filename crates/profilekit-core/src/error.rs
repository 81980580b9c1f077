//! Error and warning types shared by the scanners and operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while scanning the registry or the filesystem.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path or key.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path or key not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry API failure other than missing or denied.
    #[error("Registry error at {path}: {message}")]
    Registry { path: PathBuf, message: String },

    /// The registry is not available on this platform.
    #[error("Registry access is not supported on this platform: {path}")]
    Unsupported { path: PathBuf },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether this error means "skip and continue" rather than "abort this root".
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::PermissionDenied { .. } | Self::Unsupported { .. }
        )
    }

    /// Convert this error into a non-fatal warning.
    pub fn to_warning(&self) -> ScanWarning {
        let (path, kind) = match self {
            Self::PermissionDenied { path } => (path, WarningKind::PermissionDenied),
            Self::NotFound { path } => (path, WarningKind::NotFound),
            Self::Unsupported { path } => (path, WarningKind::NotFound),
            Self::Io { path, .. } | Self::Registry { path, .. } => (path, WarningKind::ReadError),
        };
        ScanWarning::new(path, self.to_string(), kind)
    }
}

/// Fatal configuration errors that terminate a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The rule-set output folder could not be created.
    #[error("Cannot create output folder {path}: {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rule-set output folder is still missing after creation.
    #[error("Output folder does not exist: {path}")]
    OutputFolderMissing { path: PathBuf },

    /// No documents folder could be determined for the current user.
    #[error("Cannot determine the user's documents folder")]
    NoDocumentsFolder,

    /// A cleanup target file could not be read.
    #[error("Cannot read target file {path}: {source}")]
    TargetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cleanup target file is malformed.
    #[error("Cannot parse target file {path}: {message}")]
    TargetParse { path: PathBuf, message: String },

    /// A search term is empty after trimming.
    #[error("Search term must not be empty")]
    EmptySearchTerm,

    /// A search term has no characters usable in a file name.
    #[error("Search term {term:?} contains no characters valid in a file name")]
    InvalidFileName { term: String },
}

/// Kind of non-fatal warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A root folder, file or registry key does not exist.
    NotFound,
    /// Permission was denied.
    PermissionDenied,
    /// Error reading a directory or registry key.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// A file could not be deleted.
    DeleteFailed,
}

/// Non-fatal warning encountered during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a not-found warning.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Path not found: {}", path.display()),
            path,
            kind: WarningKind::NotFound,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: &dyn std::fmt::Display) -> Self {
        let path = path.into();
        Self {
            message: format!("Read error: {error}"),
            path,
            kind: WarningKind::ReadError,
        }
    }

    /// Create a failed deletion warning.
    pub fn delete_failed(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        Self {
            message: format!("Delete failed: {error}"),
            path,
            kind: WarningKind::DeleteFailed,
        }
    }
}

impl std::fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
