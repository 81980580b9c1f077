//! Rule-set output location.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use profilekit_core::{ConfigError, SearchTerm};

/// Folder under the user's documents where rule sets are written by default.
pub const DEFAULT_RULE_FOLDER: &str = "FSLogix Rule Sets";

/// Characters Windows does not allow in file names.
const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// File name for the rule set generated for `term`, e.g. `Microsoft Visio.fxr`.
///
/// Characters Windows rejects in file names are dropped; a term with nothing
/// left is an error.
pub fn rule_set_file_name(term: &SearchTerm) -> Result<String, ConfigError> {
    let cleaned: String = term
        .as_str()
        .chars()
        .filter(|c| !c.is_control() && !INVALID_FILE_NAME_CHARS.contains(c))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(ConfigError::InvalidFileName {
            term: term.as_str().to_string(),
        });
    }
    Ok(format!("Microsoft {cleaned}.fxr"))
}

/// Where a rule set is written, and whether it existed before this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetLocation {
    /// Full path of the rule-set file.
    pub path: PathBuf,
    /// The file was already present, so new rules are appended to it.
    pub existed: bool,
}

impl RuleSetLocation {
    /// Default output folder: `<Documents>\FSLogix Rule Sets`.
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::document_dir()
            .map(|docs| docs.join(DEFAULT_RULE_FOLDER))
            .ok_or(ConfigError::NoDocumentsFolder)
    }

    /// Ensure `dir` exists and name the rule-set file for `first_term` in it.
    pub fn resolve(dir: &Path, first_term: &SearchTerm) -> Result<Self, ConfigError> {
        let file_name = rule_set_file_name(first_term)?;
        fs::create_dir_all(dir).map_err(|source| ConfigError::OutputFolder {
            path: dir.to_path_buf(),
            source,
        })?;
        if !dir.is_dir() {
            return Err(ConfigError::OutputFolderMissing {
                path: dir.to_path_buf(),
            });
        }

        let path = dir.join(file_name);
        let existed = path.exists();
        if existed {
            warn!(
                path = %path.display(),
                "rule-set file already exists; new rules will be appended"
            );
        }

        Ok(Self { path, existed })
    }
}
