//! Operations engine for profilekit.
//!
//! This crate consumes the candidate lists produced by `profilekit-scan`:
//!
//! - **Rule emission** appends normalized hiding rules to an `.fxr` rule-set
//!   file, one record per discovered registry key, file and folder
//! - **Target loading** reads named cleanup targets from an XML document
//! - **Deletion** removes aged files one by one, with a preview mode that
//!   reports without touching the disk
//!
//! Both pipelines are serial and report partial success as the normal
//! outcome: skipped roots and failed deletions become warnings.

mod cleanup;
mod error;
mod generator;
mod location;
mod rules;
mod targets;

pub use cleanup::{DeletionExecutor, DeletionReport, ProfileCleanup, format_megabytes};
pub use error::OpsError;
pub use generator::{
    RULE_COMMENT, RuleSetConfig, RuleSetConfigBuilder, RuleSetGenerator, RuleSetReport,
};
pub use location::{DEFAULT_RULE_FOLDER, RuleSetLocation, rule_set_file_name};
pub use rules::{FxrRuleFile, RULE_FILE_VERSION, RuleSink, rule_flags};
pub use targets::{TargetSource, XmlTargetFile};

// Re-export core types
pub use profilekit_core::{CleanupTarget, DeletedFileRecord, NormalizedRuleEntry, TargetPath};
