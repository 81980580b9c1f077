//! Rule-set generation pipeline.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use tracing::info;

use profilekit_core::{
    CandidatePath, ConfigError, EntryKind, KnownFolders, NormalizedRuleEntry, PathNormalizer,
    ScanWarning, SearchTerm,
};
use profilekit_scan::{FolderScanner, RegistryProvider, RegistryScanner, default_office_roots};

use crate::location::RuleSetLocation;
use crate::rules::{FxrRuleFile, RuleSink};
use crate::OpsError;

/// Comment written with every generated rule.
pub const RULE_COMMENT: &str = concat!("Generated by profilekit ", env!("CARGO_PKG_VERSION"));

/// Configuration for a rule-set generation run.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct RuleSetConfig {
    /// Search terms; the first one names the output file.
    pub terms: Vec<SearchTerm>,

    /// Folders scanned for matching files and folders
    /// (None = the default Office locations).
    #[builder(default)]
    pub folders: Option<Vec<PathBuf>>,

    /// Folder the rule-set file is written to.
    pub output_dir: PathBuf,

    /// Machine folder layout used for defaults and normalization.
    #[builder(default = "KnownFolders::from_env()")]
    pub known_folders: KnownFolders,

    /// Comment attached to every rule.
    #[builder(default = "RULE_COMMENT.to_string()")]
    pub comment: String,
}

impl RuleSetConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.terms {
            Some(terms) if !terms.is_empty() => Ok(()),
            _ => Err("At least one search term is required".to_string()),
        }
    }
}

impl RuleSetConfig {
    /// Create a new config builder.
    pub fn builder() -> RuleSetConfigBuilder {
        RuleSetConfigBuilder::default()
    }

    /// The folders to scan, falling back to the Office defaults.
    pub fn scan_roots(&self) -> Vec<PathBuf> {
        self.folders
            .clone()
            .unwrap_or_else(|| default_office_roots(&self.known_folders))
    }
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSetReport {
    /// The rule-set file written (empty when a custom sink was used).
    pub path: PathBuf,
    /// The file existed before this run.
    pub existed: bool,
    /// Rules written for registry keys.
    pub key_rules: usize,
    /// Rules written for folders.
    pub folder_rules: usize,
    /// Rules written for files.
    pub file_rules: usize,
    /// Skipped roots and keys.
    pub warnings: Vec<ScanWarning>,
}

impl RuleSetReport {
    /// Total number of rules appended.
    pub fn total_rules(&self) -> usize {
        self.key_rules + self.folder_rules + self.file_rules
    }
}

/// Scans the registry and filesystem and emits a hiding rule for every match.
pub struct RuleSetGenerator<P> {
    registry: RegistryScanner<P>,
    folders: FolderScanner,
}

impl<P: RegistryProvider> RuleSetGenerator<P> {
    /// Create a generator reading the registry through `registry`.
    pub fn new(registry: RegistryScanner<P>) -> Self {
        Self {
            registry,
            folders: FolderScanner::new(),
        }
    }

    /// Resolve the output file and write rules to it.
    pub fn run(&self, config: &RuleSetConfig) -> Result<RuleSetReport, OpsError> {
        let first = config.terms.first().ok_or(ConfigError::EmptySearchTerm)?;
        let location = RuleSetLocation::resolve(&config.output_dir, first)?;

        let mut sink = FxrRuleFile::new(&location.path);
        let mut report = self.run_with_sink(config, &mut sink)?;
        report.path = location.path;
        report.existed = location.existed;

        info!(
            path = %report.path.display(),
            rules = report.total_rules(),
            "rule set written"
        );
        Ok(report)
    }

    /// Write rules to an arbitrary sink.
    pub fn run_with_sink(
        &self,
        config: &RuleSetConfig,
        sink: &mut dyn RuleSink,
    ) -> Result<RuleSetReport, OpsError> {
        let normalizer = PathNormalizer::new(&config.known_folders);
        let mut report = RuleSetReport::default();

        let registry_scan = self.registry.scan(&config.terms);
        report.warnings.extend(registry_scan.warnings);
        for candidate in &registry_scan.matches {
            emit(sink, candidate, &normalizer, &config.comment)?;
            report.key_rules += 1;
        }

        let roots = config.scan_roots();
        for term in &config.terms {
            let folder_scan = self.folders.scan(&roots, std::slice::from_ref(term));
            report.warnings.extend(folder_scan.warnings);
            for candidate in &folder_scan.matches {
                match emit(sink, candidate, &normalizer, &config.comment)? {
                    EntryKind::FolderOrKey => report.folder_rules += 1,
                    EntryKind::FileOrValue => report.file_rules += 1,
                }
            }
        }

        Ok(report)
    }
}

fn emit(
    sink: &mut dyn RuleSink,
    candidate: &CandidatePath,
    normalizer: &PathNormalizer,
    comment: &str,
) -> Result<EntryKind, OpsError> {
    let entry = NormalizedRuleEntry::from_candidate(candidate, normalizer, comment);
    sink.append_rule(&entry)?;
    Ok(entry.kind)
}
