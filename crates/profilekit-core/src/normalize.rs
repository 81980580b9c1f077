//! Well-known folder path normalization.
//!
//! Rewrites absolute filesystem and registry paths into the symbolic
//! placeholders understood by the rule engine, so that generated rules are
//! portable across machines.

use serde::{Deserialize, Serialize};

/// Placeholder for the 32-bit Program Files folder.
pub const PROGRAM_FILES_32_TOKEN: &str = "%ProgramFilesFolder32%";
/// Placeholder for the native Program Files folder.
pub const PROGRAM_FILES_64_TOKEN: &str = "%ProgramFilesFolder64%";
/// Placeholder for the all-users Start Menu folder.
pub const COMMON_START_MENU_TOKEN: &str = "%CommonStartMenuFolder%";
/// Placeholder for the ProgramData folder.
pub const COMMON_APP_DATA_TOKEN: &str = "%CommonAppDataFolder%";

/// Provider qualifier some tools put in front of registry paths.
const REGISTRY_QUALIFIER: &str = "Registry::";

/// Machine-dependent locations of the well-known folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownFolders {
    /// `C:\Program Files (x86)` on a stock 64-bit install.
    pub program_files_x86: String,
    /// `C:\Program Files` on a stock install.
    pub program_files: String,
    /// `C:\ProgramData\Microsoft\Windows\Start Menu` on a stock install.
    pub common_start_menu: String,
    /// `C:\ProgramData` on a stock install.
    pub program_data: String,
}

impl KnownFolders {
    /// Build from explicit roots. The Start Menu lives under ProgramData.
    pub fn new(
        program_files_x86: impl Into<String>,
        program_files: impl Into<String>,
        program_data: impl Into<String>,
    ) -> Self {
        let program_data = trim_separators(&program_data.into()).to_string();
        Self {
            program_files_x86: trim_separators(&program_files_x86.into()).to_string(),
            program_files: trim_separators(&program_files.into()).to_string(),
            common_start_menu: format!(r"{program_data}\Microsoft\Windows\Start Menu"),
            program_data,
        }
    }

    /// Read the roots from the process environment, falling back to the
    /// stock Windows locations.
    pub fn from_env() -> Self {
        let var = |name: &str, fallback: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string())
        };
        Self::new(
            var("ProgramFiles(x86)", r"C:\Program Files (x86)"),
            var("ProgramFiles", r"C:\Program Files"),
            var("ProgramData", r"C:\ProgramData"),
        )
    }
}

impl Default for KnownFolders {
    fn default() -> Self {
        Self::new(
            r"C:\Program Files (x86)",
            r"C:\Program Files",
            r"C:\ProgramData",
        )
    }
}

/// A single prefix substitution.
#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    token: &'static str,
}

impl Rule {
    fn new(prefix: impl Into<String>, token: &'static str) -> Self {
        Self {
            prefix: prefix.into(),
            token,
        }
    }

    /// Replace the prefix if `path` starts with it on a component boundary.
    fn apply(&self, path: &str) -> Option<String> {
        let len = self.prefix.len();
        if len == 0 || path.len() < len || !path.is_char_boundary(len) {
            return None;
        }
        let (head, rest) = path.split_at(len);
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        if !(rest.is_empty() || rest.starts_with('\\') || rest.starts_with('/')) {
            return None;
        }
        Some(format!("{}{rest}", self.token))
    }
}

/// Maps absolute paths to well-known folder placeholders.
///
/// Rules are grouped into categories that are applied in order: registry
/// hive, then Program Files, then ProgramData. Inside a category the more
/// specific prefix comes first and only the first match is applied, so
/// `C:\Program Files (x86)\Foo` never picks up the 64-bit token.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    categories: Vec<Vec<Rule>>,
}

impl PathNormalizer {
    /// Create a normalizer for the given folder layout.
    pub fn new(folders: &KnownFolders) -> Self {
        let categories = vec![
            vec![
                Rule::new("HKEY_LOCAL_MACHINE", "HKLM"),
                Rule::new("HKEY_CURRENT_USER", "HKCU"),
            ],
            vec![
                Rule::new(&folders.program_files_x86, PROGRAM_FILES_32_TOKEN),
                Rule::new(&folders.program_files, PROGRAM_FILES_64_TOKEN),
            ],
            vec![
                Rule::new(&folders.common_start_menu, COMMON_START_MENU_TOKEN),
                Rule::new(&folders.program_data, COMMON_APP_DATA_TOKEN),
            ],
        ];
        Self { categories }
    }

    /// Normalizer for the current machine.
    pub fn from_env() -> Self {
        Self::new(&KnownFolders::from_env())
    }

    /// Normalize a path. Paths matching no rule are returned unchanged.
    pub fn normalize(&self, path: &str) -> String {
        let mut current = path.strip_prefix(REGISTRY_QUALIFIER).unwrap_or(path).to_string();
        for category in &self.categories {
            if let Some(replaced) = category.iter().find_map(|rule| rule.apply(&current)) {
                current = replaced;
            }
        }
        current
    }
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self::new(&KnownFolders::default())
    }
}

fn trim_separators(path: &str) -> &str {
    path.trim_end_matches(['\\', '/'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x86_wins_over_program_files() {
        let normalizer = PathNormalizer::default();
        assert_eq!(
            normalizer.normalize(r"C:\Program Files (x86)\Foo\foo.exe"),
            r"%ProgramFilesFolder32%\Foo\foo.exe"
        );
        assert_eq!(
            normalizer.normalize(r"C:\Program Files\Foo"),
            r"%ProgramFilesFolder64%\Foo"
        );
    }

    #[test]
    fn test_start_menu_wins_over_program_data() {
        let normalizer = PathNormalizer::default();
        assert_eq!(
            normalizer.normalize(r"C:\ProgramData\Microsoft\Windows\Start Menu\Programs\Visio.lnk"),
            r"%CommonStartMenuFolder%\Programs\Visio.lnk"
        );
        assert_eq!(
            normalizer.normalize(r"C:\ProgramData\Microsoft\Office"),
            r"%CommonAppDataFolder%\Microsoft\Office"
        );
    }

    #[test]
    fn test_registry_hive() {
        let normalizer = PathNormalizer::default();
        assert_eq!(
            normalizer.normalize(r"HKEY_LOCAL_MACHINE\SOFTWARE\Classes\CLSID\{00000000}"),
            r"HKLM\SOFTWARE\Classes\CLSID\{00000000}"
        );
        assert_eq!(
            normalizer.normalize(r"Registry::HKEY_CURRENT_USER\Software\Visio"),
            r"HKCU\Software\Visio"
        );
    }

    #[test]
    fn test_case_insensitive_prefix() {
        let normalizer = PathNormalizer::default();
        assert_eq!(
            normalizer.normalize(r"c:\program files\Microsoft Office"),
            r"%ProgramFilesFolder64%\Microsoft Office"
        );
    }

    #[test]
    fn test_requires_component_boundary() {
        let normalizer = PathNormalizer::default();
        let path = r"C:\Program FilesBackup\Foo";
        assert_eq!(normalizer.normalize(path), path);
    }

    #[test]
    fn test_unmatched_passthrough() {
        let normalizer = PathNormalizer::default();
        for path in [r"D:\Apps\Visio.exe", r"\\server\share\x", "", "relative\\path"] {
            assert_eq!(normalizer.normalize(path), path);
        }
    }

    #[test]
    fn test_known_folders_trim_trailing_separator() {
        let folders = KnownFolders::new(r"E:\PF86\", r"E:\PF\", r"E:\PD\");
        assert_eq!(folders.program_files, r"E:\PF");
        assert_eq!(folders.common_start_menu, r"E:\PD\Microsoft\Windows\Start Menu");
        let normalizer = PathNormalizer::new(&folders);
        assert_eq!(normalizer.normalize(r"E:\PF86\a"), r"%ProgramFilesFolder32%\a");
    }
}
