use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use filetime::{FileTime, set_file_mtime};
use profilekit_core::KnownFolders;
use profilekit_scan::{
    AgeScanConfig, AgedFileScanner, EntryKind, FolderScanner, MemoryRegistry, RegistryPath,
    RegistryScanner, SearchTerm, WarningKind, default_office_roots, well_known_registry_roots,
};
use tempfile::TempDir;

const CLSID: &str = r"HKLM\SOFTWARE\Classes\CLSID";
const DAY: Duration = Duration::from_secs(86_400);

fn terms(list: &[&str]) -> Vec<SearchTerm> {
    list.iter().map(|t| SearchTerm::new(t).unwrap()).collect()
}

#[test]
fn test_registry_matches_default_values() {
    let registry = MemoryRegistry::new();
    registry.insert_key(&format!(r"{CLSID}\{{00021A20}}"), Some("Microsoft Visio Document"));
    registry.insert_key(&format!(r"{CLSID}\{{00021A21}}"), Some("visio.application"));
    registry.insert_key(&format!(r"{CLSID}\{{00024500}}"), Some("Microsoft Excel Application"));
    registry.insert_key(&format!(r"{CLSID}\{{00000000}}"), None);

    let scanner = RegistryScanner::with_roots(registry, vec![RegistryPath::new(CLSID)]);
    let scan = scanner.scan(&terms(&["Visio"]));

    assert_eq!(scan.matches.len(), 2);
    assert!(scan.matches.iter().all(|m| m.kind == EntryKind::FolderOrKey));
    assert!(scan.matches[0].path.starts_with(r"HKEY_LOCAL_MACHINE\SOFTWARE\Classes\CLSID\"));
    assert_eq!(scanner.provider().open_handles(), 0);
}

#[test]
fn test_registry_missing_and_denied_roots_are_skipped() {
    let registry = MemoryRegistry::new();
    registry.insert_key(&format!(r"{CLSID}\{{1}}"), Some("Visio"));
    registry.insert_key(r"HKLM\SOFTWARE\Locked\{2}", Some("Visio"));
    registry.deny(r"HKLM\SOFTWARE\Locked");

    let scanner = RegistryScanner::with_roots(
        registry,
        vec![
            RegistryPath::new(r"HKLM\SOFTWARE\Missing"),
            RegistryPath::new(r"HKLM\SOFTWARE\Locked"),
            RegistryPath::new(CLSID),
        ],
    );
    let scan = scanner.scan(&terms(&["visio"]));

    assert_eq!(scan.matches.len(), 1);
    assert_eq!(scan.warnings.len(), 2);
    assert_eq!(scan.warnings[0].kind, WarningKind::NotFound);
    assert_eq!(scan.warnings[1].kind, WarningKind::PermissionDenied);
    assert_eq!(scanner.provider().open_handles(), 0);
}

#[test]
fn test_registry_read_failure_releases_handles() {
    let registry = MemoryRegistry::new();
    registry.insert_key(&format!(r"{CLSID}\{{1}}"), Some("Visio"));
    registry.fail_reads(CLSID);

    let scanner = RegistryScanner::with_roots(registry, vec![RegistryPath::new(CLSID)]);
    let scan = scanner.scan(&terms(&["Visio"]));

    assert!(scan.matches.is_empty());
    assert_eq!(scan.warnings[0].kind, WarningKind::ReadError);
    assert_eq!(scanner.provider().total_opens(), 1);
    assert_eq!(scanner.provider().open_handles(), 0);
}

#[test]
fn test_default_registry_roots() {
    let roots = well_known_registry_roots();
    assert!(roots.iter().any(|r| r.as_str().ends_with(r"WOW6432Node\Classes\CLSID")));
    assert!(roots.iter().any(|r| r.as_str().ends_with(r"Office\Visio\Addins")));
    assert!(roots.iter().all(|r| r.hive() == "HKEY_LOCAL_MACHINE"));
}

#[test]
fn test_default_office_roots() {
    let roots = default_office_roots(&KnownFolders::default());
    assert_eq!(roots.len(), 5);
    assert!(
        roots
            .iter()
            .any(|r| r.to_string_lossy().ends_with(r"Start Menu\Programs"))
    );
}

#[test]
fn test_folder_scan_lists_direct_children_only() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    fs::create_dir_all(root.join("VisioAddins").join("Visio.dll")).unwrap();
    fs::write(root.join("VISIO.EXE"), "x").unwrap();
    fs::write(root.join("WINWORD.EXE"), "x").unwrap();

    let scan = FolderScanner::new().scan(&[root.clone(), root.join("absent")], &terms(&["visio"]));

    assert_eq!(scan.matches.len(), 2);
    assert_eq!(scan.file_count(), 1);
    assert_eq!(scan.folder_count(), 1);
    assert_eq!(scan.warnings.len(), 1);
    assert_eq!(scan.warnings[0].kind, WarningKind::NotFound);
}

fn write_aged(path: &Path, reference: SystemTime, age: Duration) {
    fs::write(path, "0123456789").unwrap();
    set_file_mtime(path, FileTime::from_system_time(reference - age)).unwrap();
}

#[test]
fn test_aged_scan_thresholds() {
    let temp = TempDir::new().unwrap();
    let reference = SystemTime::now();
    let cache = temp.path().join("Cache");
    fs::create_dir_all(&cache).unwrap();

    write_aged(&cache.join("a.tmp"), reference, 10 * DAY);
    write_aged(&cache.join("b.tmp"), reference, 3 * DAY);
    write_aged(&temp.path().join("c.tmp"), reference, 8 * DAY);

    let config = AgeScanConfig::builder()
        .reference_time(reference)
        .build()
        .unwrap();
    let scanner = AgedFileScanner::with_config(config);

    let week = scanner.scan(temp.path(), 7);
    assert_eq!(week.files.len(), 2);
    assert_eq!(week.total_size(), 20);

    assert_eq!(scanner.scan(temp.path(), 9).files.len(), 1);
    assert_eq!(scanner.scan(temp.path(), 0).files.len(), 3);
}
