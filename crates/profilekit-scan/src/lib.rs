//! Registry and filesystem scanners for profilekit.
//!
//! # Overview
//!
//! `profilekit-scan` produces the candidate path lists consumed by the rule
//! emitter and the deletion executor:
//!
//! - **Registry key scanning** over well-known COM, Office add-in and
//!   Click-to-Run roots, matching child keys by their default value
//! - **Folder scanning** of direct children whose names start with a term
//! - **Aged file scanning** that recursively collects files past an age cutoff
//!
//! All scanners run serially and treat missing roots as warnings, never as
//! failures.
//!
//! # Example
//!
//! ```rust,no_run
//! use profilekit_scan::{AgedFileScanner, AgeScanConfig};
//!
//! let scanner = AgedFileScanner::with_config(AgeScanConfig::default());
//! let scan = scanner.scan(std::path::Path::new("/tmp"), 7);
//!
//! for file in &scan.files {
//!     println!("{} ({} bytes)", file.path.display(), file.size);
//! }
//! ```

mod aged;
mod folders;
mod registry;

pub use aged::{
    AgeScanConfig, AgeScanConfigBuilder, AgedFile, AgedFileScanner, AgedScan, cutoff, is_expired,
};
pub use folders::{FolderScan, FolderScanner, default_office_roots};
pub use registry::{
    KeyScope, MemoryRegistry, RegistryPath, RegistryProvider, RegistryScan, RegistryScanner,
    SystemRegistry, well_known_registry_roots,
};

// Re-export core types for convenience
pub use profilekit_core::{
    CandidatePath, EntryKind, ScanError, ScanWarning, SearchTerm, WarningKind,
};
