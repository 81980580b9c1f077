//! Rule-set file emission.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use profilekit_core::{EntryKind, NormalizedRuleEntry};

use crate::OpsError;

/// Version header written as the first line of a new rule-set file.
pub const RULE_FILE_VERSION: &str = "0001";

const FLAG_DIR_OR_KEY: u32 = 0x0000_0001;
const FLAG_FILE_OR_VALUE: u32 = 0x0000_0002;
const FLAG_TYPE_HIDING: u32 = 0x0000_0200;

const COMMENT_PREFIX: &str = "##";
const LINE_END: &str = "\r\n";

/// Flag word for a hiding rule of the given kind.
pub fn rule_flags(kind: EntryKind) -> u32 {
    let source = match kind {
        EntryKind::FolderOrKey => FLAG_DIR_OR_KEY,
        EntryKind::FileOrValue => FLAG_FILE_OR_VALUE,
    };
    FLAG_TYPE_HIDING | source
}

/// Destination for hiding rules.
pub trait RuleSink {
    /// Append one rule.
    fn append_rule(&mut self, entry: &NormalizedRuleEntry) -> Result<(), OpsError>;
}

impl RuleSink for Vec<NormalizedRuleEntry> {
    fn append_rule(&mut self, entry: &NormalizedRuleEntry) -> Result<(), OpsError> {
        self.push(entry.clone());
        Ok(())
    }
}

/// An `.fxr` rule-set file.
///
/// The file is created with a version header when missing; every rule is
/// appended as a comment line followed by a rule line. Existing content is
/// never rewritten, so repeated runs accumulate duplicate rules.
#[derive(Debug, Clone)]
pub struct FxrRuleFile {
    path: PathBuf,
}

impl FxrRuleFile {
    /// A rule file at `path`. Nothing is touched until the first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every rule back from the file.
    pub fn read_rules(&self) -> Result<Vec<NormalizedRuleEntry>, OpsError> {
        let content = fs::read_to_string(&self.path).map_err(|source| OpsError::RuleRead {
            path: self.path.clone(),
            source,
        })?;

        let mut rules = Vec::new();
        let mut comment = String::new();
        for line in content.lines() {
            if let Some(text) = line.strip_prefix(COMMENT_PREFIX) {
                comment = text.to_string();
            } else if let Some(entry) = parse_rule_line(line, &comment) {
                rules.push(entry);
                comment.clear();
            }
        }
        Ok(rules)
    }

    fn write_err(&self, source: std::io::Error) -> OpsError {
        OpsError::RuleWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl RuleSink for FxrRuleFile {
    fn append_rule(&mut self, entry: &NormalizedRuleEntry) -> Result<(), OpsError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_err(e))?;

        let is_new = file.metadata().map_err(|e| self.write_err(e))?.len() == 0;

        let mut record = String::new();
        if is_new {
            record.push_str(RULE_FILE_VERSION);
            record.push_str(LINE_END);
        }
        record.push_str(&format!("{COMMENT_PREFIX}{}{LINE_END}", entry.comment));
        record.push_str(&format!(
            "\"{}\"\t\"\"\t0x{:08X}{LINE_END}",
            entry.path,
            rule_flags(entry.kind)
        ));

        file.write_all(record.as_bytes()).map_err(|e| self.write_err(e))?;
        debug!(rule = %entry.path, kind = %entry.kind, "rule appended");
        Ok(())
    }
}

fn parse_rule_line(line: &str, comment: &str) -> Option<NormalizedRuleEntry> {
    let rest = line.strip_prefix('"')?;
    let (path, rest) = rest.split_once('"')?;
    let flags = rest.rsplit('\t').next()?.trim();
    let flags = u32::from_str_radix(flags.strip_prefix("0x")?, 16).ok()?;

    let kind = if flags & FLAG_DIR_OR_KEY != 0 {
        EntryKind::FolderOrKey
    } else {
        EntryKind::FileOrValue
    };

    Some(NormalizedRuleEntry {
        path: path.to_string(),
        kind,
        comment: comment.to_string(),
    })
}
