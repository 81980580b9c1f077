//! Core types and helpers for profilekit.
//!
//! This crate provides the data model shared by the rule-set generator and
//! the profile cleanup tool: candidate paths, rule entries, cleanup targets,
//! deletion records, the well-known folder path normalizer and the
//! `%NAME%` placeholder expander.

mod env;
mod error;
mod normalize;
mod types;

pub use env::{expand_env, expand_tokens};
pub use error::{ConfigError, ScanError, ScanWarning, WarningKind};
pub use normalize::{
    COMMON_APP_DATA_TOKEN, COMMON_START_MENU_TOKEN, KnownFolders, PROGRAM_FILES_32_TOKEN,
    PROGRAM_FILES_64_TOKEN, PathNormalizer,
};
pub use types::{
    CandidatePath, CleanupTarget, DeletedFileRecord, EntryKind, NormalizedRuleEntry, SearchTerm,
    TargetPath,
};
