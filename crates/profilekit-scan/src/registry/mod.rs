//! Registry key scanning.
//!
//! Walks a fixed set of well-known registry roots, lists their immediate
//! child keys and keeps every child whose default value contains one of the
//! search terms.

mod memory;
#[cfg(windows)]
mod win32;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use profilekit_core::{CandidatePath, ScanError, ScanWarning, SearchTerm};

pub use memory::MemoryRegistry;
#[cfg(windows)]
pub use win32::SystemRegistry;

/// Machine hive of the Click-to-Run virtual registry.
const CLICK_TO_RUN_MACHINE: &str =
    r"HKLM\SOFTWARE\Microsoft\Office\ClickToRun\REGISTRY\MACHINE\Software";

/// Office applications whose per-app add-in keys are scanned.
const OFFICE_ADDIN_APPS: &[&str] = &[
    "Word",
    "Excel",
    "PowerPoint",
    "Outlook",
    "Access",
    "Publisher",
    "OneNote",
    "Visio",
    "MS Project",
];

/// A fully qualified registry key path such as
/// `HKEY_LOCAL_MACHINE\SOFTWARE\Classes\CLSID`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegistryPath(String);

impl RegistryPath {
    /// Create a path. Short hive names (`HKLM`, `HKCU`, ...) are expanded and
    /// surrounding separators are trimmed.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path.as_ref().trim_matches('\\');
        let (hive, rest) = match path.split_once('\\') {
            Some((hive, rest)) => (hive, Some(rest)),
            None => (path, None),
        };
        let hive = expand_hive(hive);
        match rest {
            Some(rest) => Self(format!("{hive}\\{rest}")),
            None => Self(hive.to_string()),
        }
    }

    /// The full path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The hive name, e.g. `HKEY_LOCAL_MACHINE`.
    pub fn hive(&self) -> &str {
        self.0.split_once('\\').map_or(self.0.as_str(), |(hive, _)| hive)
    }

    /// The path below the hive (empty for the hive itself).
    pub fn subkey(&self) -> &str {
        self.0.split_once('\\').map_or("", |(_, rest)| rest)
    }

    /// Path of a direct child key.
    pub fn join(&self, child: &str) -> Self {
        Self(format!("{}\\{}", self.0, child))
    }

    /// The path as a `PathBuf`, for warnings.
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl std::fmt::Display for RegistryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn expand_hive(hive: &str) -> &str {
    match hive.to_ascii_uppercase().as_str() {
        "HKLM" | "HKEY_LOCAL_MACHINE" => "HKEY_LOCAL_MACHINE",
        "HKCU" | "HKEY_CURRENT_USER" => "HKEY_CURRENT_USER",
        "HKCR" | "HKEY_CLASSES_ROOT" => "HKEY_CLASSES_ROOT",
        "HKU" | "HKEY_USERS" => "HKEY_USERS",
        _ => hive,
    }
}

/// Read access to a registry.
///
/// Keys are opened with [`RegistryProvider::open`] and must be handed back
/// to [`RegistryProvider::close`]; use [`KeyScope`] so that happens on every
/// exit path.
pub trait RegistryProvider {
    /// An open key handle.
    type Key;

    /// Open a key for reading.
    fn open(&self, path: &RegistryPath) -> Result<Self::Key, ScanError>;

    /// Names of the immediate child keys.
    fn subkey_names(&self, key: &Self::Key) -> Result<Vec<String>, ScanError>;

    /// The key's default (unnamed) value, if it is set and is a string.
    fn default_value(&self, key: &Self::Key) -> Result<Option<String>, ScanError>;

    /// Release a key handle.
    fn close(&self, key: Self::Key);
}

/// An open registry key that is closed when the scope ends.
pub struct KeyScope<'p, P: RegistryProvider> {
    provider: &'p P,
    key: Option<P::Key>,
}

impl<'p, P: RegistryProvider> KeyScope<'p, P> {
    /// Open `path` for the lifetime of the returned scope.
    pub fn open(provider: &'p P, path: &RegistryPath) -> Result<Self, ScanError> {
        let key = provider.open(path)?;
        Ok(Self {
            provider,
            key: Some(key),
        })
    }

    /// Names of the immediate child keys.
    pub fn subkey_names(&self) -> Result<Vec<String>, ScanError> {
        match &self.key {
            Some(key) => self.provider.subkey_names(key),
            None => Ok(Vec::new()),
        }
    }

    /// The key's default value.
    pub fn default_value(&self) -> Result<Option<String>, ScanError> {
        match &self.key {
            Some(key) => self.provider.default_value(key),
            None => Ok(None),
        }
    }
}

impl<P: RegistryProvider> Drop for KeyScope<'_, P> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.provider.close(key);
        }
    }
}

/// Registry roots scanned by default: COM class registrations (native and
/// WOW64), the Click-to-Run virtual registry, and Office add-in keys.
pub fn well_known_registry_roots() -> Vec<RegistryPath> {
    let mut roots = vec![
        RegistryPath::new(r"HKLM\SOFTWARE\Classes\CLSID"),
        RegistryPath::new(r"HKLM\SOFTWARE\WOW6432Node\Classes\CLSID"),
        RegistryPath::new(format!(r"{CLICK_TO_RUN_MACHINE}\Classes\CLSID")),
        RegistryPath::new(format!(r"{CLICK_TO_RUN_MACHINE}\Wow6432Node\Classes\CLSID")),
    ];
    roots.extend(
        OFFICE_ADDIN_APPS
            .iter()
            .map(|app| RegistryPath::new(format!(r"HKLM\SOFTWARE\Microsoft\Office\{app}\Addins"))),
    );
    roots
}

/// Result of a registry scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryScan {
    /// Matching keys, tagged as keys.
    pub matches: Vec<CandidatePath>,
    /// Skipped roots and keys.
    pub warnings: Vec<ScanWarning>,
}

/// Scans well-known registry roots for keys whose default value mentions a
/// search term.
pub struct RegistryScanner<P> {
    provider: P,
    roots: Vec<RegistryPath>,
}

impl<P: RegistryProvider> RegistryScanner<P> {
    /// Create a scanner over the default roots.
    pub fn new(provider: P) -> Self {
        Self::with_roots(provider, well_known_registry_roots())
    }

    /// Create a scanner over custom roots.
    pub fn with_roots(provider: P, roots: Vec<RegistryPath>) -> Self {
        Self { provider, roots }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The roots this scanner walks.
    pub fn roots(&self) -> &[RegistryPath] {
        &self.roots
    }

    /// Scan every root for the given terms.
    ///
    /// Missing or inaccessible roots are skipped with a warning. Any other
    /// failure abandons the current root only.
    pub fn scan(&self, terms: &[SearchTerm]) -> RegistryScan {
        let mut scan = RegistryScan::default();

        for root in &self.roots {
            match self.scan_root(root, terms, &mut scan) {
                Ok(found) => {
                    debug!(root = %root, found, "registry root scanned");
                }
                Err(err) if err.is_skippable() => {
                    warn!(root = %root, "skipping registry root: {err}");
                    scan.warnings.push(err.to_warning());
                }
                Err(err) => {
                    warn!(root = %root, "aborting registry root: {err}");
                    scan.warnings.push(err.to_warning());
                }
            }
        }

        info!(matches = scan.matches.len(), "registry scan complete");
        scan
    }

    /// Scan one root, returning the number of matches it contributed.
    fn scan_root(
        &self,
        root: &RegistryPath,
        terms: &[SearchTerm],
        scan: &mut RegistryScan,
    ) -> Result<usize, ScanError> {
        let scope = KeyScope::open(&self.provider, root)?;
        let mut found = 0;

        for name in scope.subkey_names()? {
            let child = root.join(&name);
            let child_scope = match KeyScope::open(&self.provider, &child) {
                Ok(s) => s,
                Err(err) if err.is_skippable() => {
                    debug!(key = %child, "skipping registry key: {err}");
                    scan.warnings.push(err.to_warning());
                    continue;
                }
                Err(err) => return Err(err),
            };

            let value = match child_scope.default_value() {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(err) if err.is_skippable() => {
                    debug!(key = %child, "skipping unreadable registry key: {err}");
                    scan.warnings.push(err.to_warning());
                    continue;
                }
                Err(err) => return Err(err),
            };

            if terms.iter().any(|term| term.contained_in(&value)) {
                debug!(key = %child, value = %value, "registry match");
                scan.matches.push(CandidatePath::folder_or_key(child.as_str()));
                found += 1;
            }
        }

        Ok(found)
    }
}

/// Registry stand-in for platforms without a registry. Every open reports
/// the key as unsupported, which scanners treat as a skipped root.
#[cfg(not(windows))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRegistry;

#[cfg(not(windows))]
impl SystemRegistry {
    /// Create the provider.
    pub fn new() -> Self {
        Self
    }
}

#[cfg(not(windows))]
impl RegistryProvider for SystemRegistry {
    type Key = std::convert::Infallible;

    fn open(&self, path: &RegistryPath) -> Result<Self::Key, ScanError> {
        Err(ScanError::Unsupported {
            path: path.to_path_buf(),
        })
    }

    fn subkey_names(&self, key: &Self::Key) -> Result<Vec<String>, ScanError> {
        match *key {}
    }

    fn default_value(&self, key: &Self::Key) -> Result<Option<String>, ScanError> {
        match *key {}
    }

    fn close(&self, key: Self::Key) {
        match key {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> Vec<SearchTerm> {
        list.iter().map(|t| SearchTerm::new(t).unwrap()).collect()
    }

    fn sample_registry() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        let clsid = r"HKLM\SOFTWARE\Classes\CLSID";
        registry.insert_key(&format!(r"{clsid}\{{11111111}}"), Some("Microsoft Visio Drawing"));
        registry.insert_key(&format!(r"{clsid}\{{22222222}}"), Some("Microsoft Word Document"));
        registry.insert_key(&format!(r"{clsid}\{{33333333}}"), None);
        registry.insert_key(&format!(r"{clsid}\{{44444444}}"), Some("visio viewer control"));
        registry
    }

    #[test]
    fn test_registry_path_expands_hive() {
        let path = RegistryPath::new(r"HKLM\SOFTWARE\Classes\");
        assert_eq!(path.as_str(), r"HKEY_LOCAL_MACHINE\SOFTWARE\Classes");
        assert_eq!(path.hive(), "HKEY_LOCAL_MACHINE");
        assert_eq!(path.subkey(), r"SOFTWARE\Classes");
        assert_eq!(path.join("CLSID").as_str(), r"HKEY_LOCAL_MACHINE\SOFTWARE\Classes\CLSID");
    }

    #[test]
    fn test_scan_matches_default_values() {
        let scanner = RegistryScanner::with_roots(
            sample_registry(),
            vec![RegistryPath::new(r"HKLM\SOFTWARE\Classes\CLSID")],
        );
        let scan = scanner.scan(&terms(&["Visio"]));

        let paths: Vec<&str> = scan.matches.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                r"HKEY_LOCAL_MACHINE\SOFTWARE\Classes\CLSID\{11111111}",
                r"HKEY_LOCAL_MACHINE\SOFTWARE\Classes\CLSID\{44444444}",
            ]
        );
        assert!(scan.matches.iter().all(|m| m.kind == profilekit_core::EntryKind::FolderOrKey));
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let scanner = RegistryScanner::with_roots(
            sample_registry(),
            vec![
                RegistryPath::new(r"HKLM\SOFTWARE\Nope"),
                RegistryPath::new(r"HKLM\SOFTWARE\Classes\CLSID"),
            ],
        );
        let scan = scanner.scan(&terms(&["word"]));

        assert_eq!(scan.matches.len(), 1);
        assert_eq!(scan.warnings.len(), 1);
        assert_eq!(scan.warnings[0].kind, profilekit_core::WarningKind::NotFound);
    }

    #[test]
    fn test_handles_released_after_read_failure() {
        let registry = sample_registry();
        registry.fail_reads(r"HKLM\SOFTWARE\Classes\CLSID\{22222222}");
        let scanner = RegistryScanner::with_roots(
            registry,
            vec![RegistryPath::new(r"HKLM\SOFTWARE\Classes\CLSID")],
        );

        let scan = scanner.scan(&terms(&["Visio"]));

        // The failure aborts the root after the first match.
        assert_eq!(scan.matches.len(), 1);
        assert_eq!(scan.warnings.len(), 1);
        assert_eq!(scanner.provider().open_handles(), 0);
        assert!(scanner.provider().total_opens() > 0);
    }

    #[test]
    fn test_denied_value_read_skips_only_that_key() {
        let registry = sample_registry();
        registry.deny_reads(r"HKLM\SOFTWARE\Classes\CLSID\{11111111}");
        let scanner = RegistryScanner::with_roots(
            registry,
            vec![RegistryPath::new(r"HKLM\SOFTWARE\Classes\CLSID")],
        );

        let scan = scanner.scan(&terms(&["Visio"]));

        assert_eq!(scan.matches.len(), 1);
        assert!(scan.matches[0].path.ends_with("{44444444}"));
        assert_eq!(scan.warnings.len(), 1);
        assert_eq!(scan.warnings[0].kind, profilekit_core::WarningKind::PermissionDenied);
        assert_eq!(scanner.provider().open_handles(), 0);
    }

    #[test]
    fn test_default_roots_cover_clsid_and_addins() {
        let roots = well_known_registry_roots();
        assert!(roots.iter().any(|r| r.as_str().ends_with(r"SOFTWARE\Classes\CLSID")));
        assert!(roots.iter().any(|r| r.as_str().contains("ClickToRun")));
        assert!(roots.iter().any(|r| r.as_str().ends_with(r"Office\Visio\Addins")));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_system_registry_unsupported_is_skipped() {
        let scanner = RegistryScanner::new(SystemRegistry::new());
        let scan = scanner.scan(&terms(&["Visio"]));
        assert!(scan.matches.is_empty());
        assert_eq!(scan.warnings.len(), scanner.roots().len());
    }
}
