//! Age-based file collection.
//!
//! Recursively finds files whose last modification is at or before a
//! cutoff derived from a reference time and an age in days. These are the
//! candidates the cleanup tool removes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use derive_builder::Builder;
use jwalk::{Parallelism, WalkDir};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use profilekit_core::{ScanError, ScanWarning, WarningKind};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration for aged file scanning.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct AgeScanConfig {
    /// Reference time for age calculations (default: now).
    #[builder(default = "SystemTime::now()")]
    pub reference_time: SystemTime,

    /// Follow symbolic links while descending.
    #[builder(default = "false")]
    pub follow_symlinks: bool,
}

impl Default for AgeScanConfig {
    fn default() -> Self {
        Self {
            reference_time: SystemTime::now(),
            follow_symlinks: false,
        }
    }
}

impl AgeScanConfig {
    /// Create a new config builder.
    pub fn builder() -> AgeScanConfigBuilder {
        AgeScanConfigBuilder::default()
    }
}

/// The instant `days` days before `reference`.
pub fn cutoff(reference: SystemTime, days: u64) -> SystemTime {
    let age = Duration::from_secs(days.saturating_mul(SECS_PER_DAY));
    reference.checked_sub(age).unwrap_or(UNIX_EPOCH)
}

/// Whether a file modified at `modified` is old enough to remove.
/// The boundary is inclusive.
pub fn is_expired(modified: SystemTime, cutoff: SystemTime) -> bool {
    modified <= cutoff
}

/// A file past its age threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgedFile {
    /// Path to the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Result of an aged file scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgedScan {
    /// Expired files, in path order.
    pub files: Vec<AgedFile>,
    /// Unreadable entries.
    pub warnings: Vec<ScanWarning>,
}

impl AgedScan {
    /// Total size of the expired files.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Collects files older than a threshold.
pub struct AgedFileScanner {
    config: AgeScanConfig,
}

impl AgedFileScanner {
    /// Create a scanner with default config.
    pub fn new() -> Self {
        Self {
            config: AgeScanConfig::default(),
        }
    }

    /// Create a scanner with custom config.
    pub fn with_config(config: AgeScanConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &AgeScanConfig {
        &self.config
    }

    /// Find files under `root` last modified at least `max_age_days` days
    /// before the reference time.
    ///
    /// A missing root yields an empty result. A root naming a single file
    /// is evaluated on its own.
    pub fn scan(&self, root: &Path, max_age_days: u64) -> AgedScan {
        let limit = cutoff(self.config.reference_time, max_age_days);
        let mut scan = AgedScan::default();

        let root_meta = match std::fs::metadata(root) {
            Ok(m) => m,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(root = %root.display(), "cleanup path not present");
                return scan;
            }
            Err(err) => {
                warn!(root = %root.display(), "cannot read cleanup path: {err}");
                scan.warnings.push(ScanError::io(root, err).to_warning());
                return scan;
            }
        };

        if root_meta.is_file() {
            match root_meta.modified() {
                Ok(modified) if is_expired(modified, limit) => scan.files.push(AgedFile {
                    path: root.to_path_buf(),
                    size: root_meta.len(),
                    modified,
                }),
                Ok(_) => {}
                Err(err) => {
                    warn!(path = %root.display(), "cannot read modification time: {err}");
                    scan.warnings.push(metadata_warning(root, &err));
                }
            }
            return scan;
        }

        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(self.config.follow_symlinks)
            .sort(true);

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    scan.warnings.push(ScanWarning::read_error(path, &err));
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(err) => {
                    scan.warnings.push(metadata_warning(&path, &err));
                    continue;
                }
            };
            let modified = match metadata.modified() {
                Ok(t) => t,
                Err(err) => {
                    scan.warnings.push(metadata_warning(&path, &err));
                    continue;
                }
            };

            if is_expired(modified, limit) {
                scan.files.push(AgedFile {
                    path,
                    size: metadata.len(),
                    modified,
                });
            }
        }

        info!(
            root = %root.display(),
            max_age_days,
            expired = scan.files.len(),
            "aged file scan complete"
        );
        scan
    }
}

fn metadata_warning(path: &Path, err: &dyn std::fmt::Display) -> ScanWarning {
    ScanWarning::new(path, err.to_string(), WarningKind::MetadataError)
}

impl Default for AgedFileScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use std::fs;
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(SECS_PER_DAY);

    fn write_aged(path: &Path, reference: SystemTime, age: Duration) {
        fs::write(path, "data").unwrap();
        set_file_mtime(path, FileTime::from_system_time(reference - age)).unwrap();
    }

    fn scanner_at(reference: SystemTime) -> AgedFileScanner {
        let config = AgeScanConfig::builder().reference_time(reference).build().unwrap();
        AgedFileScanner::with_config(config)
    }

    #[test]
    fn test_cutoff_saturates() {
        assert_eq!(cutoff(UNIX_EPOCH + DAY, 2), UNIX_EPOCH);
        assert_eq!(cutoff(UNIX_EPOCH + 3 * DAY, 1), UNIX_EPOCH + 2 * DAY);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let temp = TempDir::new().unwrap();
        let reference = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        write_aged(&temp.path().join("exact.log"), reference, 7 * DAY);
        write_aged(
            &temp.path().join("younger.log"),
            reference,
            7 * DAY - Duration::from_secs(1),
        );

        let scan = scanner_at(reference).scan(temp.path(), 7);

        assert_eq!(scan.files.len(), 1);
        assert!(scan.files[0].path.ends_with("exact.log"));
    }

    #[test]
    fn test_recursive_files_only() {
        let temp = TempDir::new().unwrap();
        let reference = SystemTime::now();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        write_aged(&nested.join("old.tmp"), reference, 30 * DAY);
        write_aged(&temp.path().join("new.tmp"), reference, DAY);
        set_file_mtime(&nested, FileTime::from_system_time(reference - 90 * DAY)).unwrap();

        let scan = scanner_at(reference).scan(temp.path(), 10);

        assert_eq!(scan.files.len(), 1);
        assert!(scan.files[0].path.ends_with("old.tmp"));
        assert_eq!(scan.total_size(), 4);
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        let scan = AgedFileScanner::new().scan(&temp.path().join("missing"), 1);
        assert!(scan.files.is_empty());
        assert!(scan.warnings.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_root_is_reported() {
        let temp = TempDir::new().unwrap();
        let looped = temp.path().join("looped");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();

        let scan = AgedFileScanner::new().scan(&looped, 0);

        assert!(scan.files.is_empty());
        assert_eq!(scan.warnings.len(), 1);
        assert_eq!(scan.warnings[0].kind, WarningKind::ReadError);
        assert_eq!(scan.warnings[0].path, looped);
    }

    #[test]
    fn test_single_file_root() {
        let temp = TempDir::new().unwrap();
        let reference = SystemTime::now();
        let file = temp.path().join("single.dmp");
        write_aged(&file, reference, 3 * DAY);

        assert_eq!(scanner_at(reference).scan(&file, 2).files.len(), 1);
        assert!(scanner_at(reference).scan(&file, 5).files.is_empty());
    }
}
