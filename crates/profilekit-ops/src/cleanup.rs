//! Aged file deletion.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use profilekit_core::{DeletedFileRecord, ScanWarning, expand_env};
use profilekit_scan::{AgeScanConfig, AgedFile, AgedFileScanner};

use crate::OpsError;
use crate::targets::TargetSource;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// Render a byte count in the fixed report unit, e.g. `12.50 MB`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MEGABYTE)
}

/// Outcome of a deletion pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionReport {
    /// Every file considered, in processing order.
    pub records: Vec<DeletedFileRecord>,
    /// Bytes actually removed.
    pub freed_bytes: u64,
    /// Number of files that could not be removed.
    pub failed: usize,
    /// Nothing was removed; the records are a preview.
    pub dry_run: bool,
    /// Failed deletions and unreadable entries.
    pub warnings: Vec<ScanWarning>,
}

impl DeletionReport {
    /// Total size of every candidate, whether removed or not.
    pub fn would_free_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.size).sum()
    }

    /// Number of files removed.
    pub fn deleted_count(&self) -> usize {
        self.records.iter().filter(|r| r.deleted).count()
    }

    /// The byte count to show the user: freed, or would-be freed in preview.
    pub fn reported_bytes(&self) -> u64 {
        if self.dry_run {
            self.would_free_bytes()
        } else {
            self.freed_bytes
        }
    }

    /// One-line summary, `Freed: 1.00 MB` or `Would free: 1.00 MB`.
    pub fn summary(&self) -> String {
        let label = if self.dry_run { "Would free" } else { "Freed" };
        format!("{label}: {}", format_megabytes(self.reported_bytes()))
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: DeletionReport) {
        self.records.extend(other.records);
        self.freed_bytes += other.freed_bytes;
        self.failed += other.failed;
        self.warnings.extend(other.warnings);
    }
}

/// Removes files one at a time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletionExecutor {
    dry_run: bool,
}

impl DeletionExecutor {
    /// Create an executor. With `dry_run` set the filesystem is never touched.
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Whether this executor only previews.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Delete every file in `files`. A failure is recorded and the next
    /// file is processed.
    pub fn execute(&self, files: Vec<AgedFile>) -> DeletionReport {
        let mut report = DeletionReport {
            dry_run: self.dry_run,
            ..Default::default()
        };

        for file in files {
            let mut record = DeletedFileRecord::pending(file.path, file.size, file.modified);

            if self.dry_run {
                debug!(path = %record.path.display(), size = record.size, "would delete");
                report.records.push(record);
                continue;
            }

            match force_remove(&record.path) {
                Ok(()) => {
                    debug!(path = %record.path.display(), size = record.size, "deleted");
                    record.deleted = true;
                    report.freed_bytes += record.size;
                }
                Err(err) => {
                    warn!(path = %record.path.display(), "failed to delete: {err}");
                    report.warnings.push(ScanWarning::delete_failed(&record.path, &err));
                    record.error = Some(err.to_string());
                    report.failed += 1;
                }
            }
            report.records.push(record);
        }

        report
    }
}

/// Remove a file, clearing the read-only attribute first where it blocks deletion.
fn force_remove(path: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        let mut permissions = fs::symlink_metadata(path)?.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
        }
    }
    fs::remove_file(path)
}

/// Loads cleanup targets, finds aged files under each path and removes them.
pub struct ProfileCleanup {
    scanner: AgedFileScanner,
    executor: DeletionExecutor,
    resolver: Box<dyn Fn(&str) -> String>,
}

impl ProfileCleanup {
    /// Create a cleanup run that expands `%NAME%` tokens from the environment.
    pub fn new(config: AgeScanConfig, dry_run: bool) -> Self {
        Self {
            scanner: AgedFileScanner::with_config(config),
            executor: DeletionExecutor::new(dry_run),
            resolver: Box::new(expand_env),
        }
    }

    /// Replace the function that expands declared paths.
    pub fn with_resolver(mut self, resolver: impl Fn(&str) -> String + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Whether this run only previews.
    pub fn is_dry_run(&self) -> bool {
        self.executor.is_dry_run()
    }

    /// Process every target from `source` and return the combined report.
    pub fn run(&self, source: &dyn TargetSource) -> Result<DeletionReport, OpsError> {
        let targets = source.load_targets()?;
        let mut report = DeletionReport {
            dry_run: self.is_dry_run(),
            ..Default::default()
        };

        for target in &targets {
            let before = report.records.len();
            for entry in &target.paths {
                let root = PathBuf::from((self.resolver)(&entry.path));
                let scan = self.scanner.scan(&root, entry.max_age_days);
                report.warnings.extend(scan.warnings);
                report.merge(self.executor.execute(scan.files));
            }
            info!(
                target = %target.name,
                files = report.records.len() - before,
                dry_run = report.dry_run,
                "target processed"
            );
        }

        info!(
            targets = targets.len(),
            files = report.records.len(),
            failed = report.failed,
            "{}",
            report.summary()
        );
        Ok(report)
    }
}
