//! Error type for rule emission and cleanup.

use std::path::PathBuf;

use thiserror::Error;

use profilekit_core::ConfigError;

/// Errors that can occur while emitting rules or running a cleanup.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Fatal configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The rule-set file could not be written.
    #[error("Cannot write rule-set file {path}: {source}")]
    RuleWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rule-set file could not be read back.
    #[error("Cannot read rule-set file {path}: {source}")]
    RuleRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
