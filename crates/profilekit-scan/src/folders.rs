//! Non-recursive folder scanning by name prefix.

use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use profilekit_core::{CandidatePath, KnownFolders, ScanWarning, SearchTerm};

/// Office install and shortcut folders scanned when no roots are given.
pub fn default_office_roots(folders: &KnownFolders) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    for program_files in [&folders.program_files, &folders.program_files_x86] {
        roots.push(PathBuf::from(format!(r"{program_files}\Microsoft Office\root\Office16")));
        roots.push(PathBuf::from(format!(r"{program_files}\Microsoft Office\Office16")));
    }
    roots.push(PathBuf::from(format!(r"{}\Programs", folders.common_start_menu)));
    roots
}

/// Result of a folder scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderScan {
    /// Matching files and folders.
    pub matches: Vec<CandidatePath>,
    /// Skipped roots and unreadable entries.
    pub warnings: Vec<ScanWarning>,
}

impl FolderScan {
    /// Number of matched files.
    pub fn file_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| m.kind == profilekit_core::EntryKind::FileOrValue)
            .count()
    }

    /// Number of matched folders.
    pub fn folder_count(&self) -> usize {
        self.matches.len() - self.file_count()
    }
}

/// Lists direct children of root folders whose names start with a term.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderScanner;

impl FolderScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        Self
    }

    /// Scan each root for children named after any of the terms.
    pub fn scan(&self, roots: &[PathBuf], terms: &[SearchTerm]) -> FolderScan {
        let mut scan = FolderScan::default();
        for root in roots {
            self.scan_root(root, terms, &mut scan);
        }
        info!(matches = scan.matches.len(), "folder scan complete");
        scan
    }

    fn scan_root(&self, root: &Path, terms: &[SearchTerm], scan: &mut FolderScan) {
        // Rule paths must not depend on the working directory.
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        let root = root.as_path();
        if !root.is_dir() {
            debug!(root = %root.display(), "folder not present, skipping");
            scan.warnings.push(ScanWarning::not_found(root));
            return;
        }

        let walker = WalkDir::new(root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(1)
            .max_depth(1);

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    scan.warnings.push(ScanWarning::read_error(path, &err));
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy();
            if !terms.iter().any(|term| term.matches_prefix(&name)) {
                continue;
            }

            let path = entry.path().to_string_lossy().into_owned();
            let candidate = if entry.file_type().is_dir() {
                CandidatePath::folder_or_key(path)
            } else {
                CandidatePath::file_or_value(path)
            };
            debug!(path = %candidate.path, kind = %candidate.kind, "folder match");
            scan.matches.push(candidate);
        }
    }
}
