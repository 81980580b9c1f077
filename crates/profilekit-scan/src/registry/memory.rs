//! In-memory registry.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use profilekit_core::ScanError;

use super::{RegistryPath, RegistryProvider};

#[derive(Debug, Clone)]
struct MemoryKey {
    name: String,
    default: Option<String>,
}

/// A registry held in memory.
///
/// Key lookups are case-insensitive like the Windows registry. Open handles
/// are counted so callers can check that every key was closed.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    keys: RefCell<BTreeMap<String, MemoryKey>>,
    denied: RefCell<HashSet<String>>,
    broken: RefCell<HashSet<String>>,
    unreadable: RefCell<HashSet<String>>,
    open_handles: Cell<usize>,
    total_opens: Cell<usize>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key (and any missing parents) with an optional default value.
    pub fn insert_key(&self, path: &str, default: Option<&str>) {
        let path = RegistryPath::new(path);
        let mut keys = self.keys.borrow_mut();

        let mut current = String::new();
        for part in path.as_str().split('\\') {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(part);
            keys.entry(current.to_lowercase()).or_insert_with(|| MemoryKey {
                name: part.to_string(),
                default: None,
            });
        }

        if let Some(key) = keys.get_mut(&path.as_str().to_lowercase()) {
            key.default = default.map(str::to_string);
        }
    }

    /// Make opening `path` fail with access denied.
    pub fn deny(&self, path: &str) {
        self.denied.borrow_mut().insert(fold(&RegistryPath::new(path)));
    }

    /// Make reads on `path` fail with a registry error after it opens.
    pub fn fail_reads(&self, path: &str) {
        self.broken.borrow_mut().insert(fold(&RegistryPath::new(path)));
    }

    /// Make reads on `path` fail with access denied after it opens.
    pub fn deny_reads(&self, path: &str) {
        self.unreadable.borrow_mut().insert(fold(&RegistryPath::new(path)));
    }

    /// Number of keys currently open.
    pub fn open_handles(&self) -> usize {
        self.open_handles.get()
    }

    /// Number of successful opens so far.
    pub fn total_opens(&self) -> usize {
        self.total_opens.get()
    }

    fn check_readable(&self, key: &str) -> Result<(), ScanError> {
        if self.unreadable.borrow().contains(key) {
            return Err(ScanError::PermissionDenied { path: key.into() });
        }
        if self.broken.borrow().contains(key) {
            return Err(ScanError::Registry {
                path: key.into(),
                message: "simulated read failure".to_string(),
            });
        }
        Ok(())
    }
}

impl RegistryProvider for MemoryRegistry {
    type Key = String;

    fn open(&self, path: &RegistryPath) -> Result<Self::Key, ScanError> {
        let folded = fold(path);
        if self.denied.borrow().contains(&folded) {
            return Err(ScanError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        if !self.keys.borrow().contains_key(&folded) {
            return Err(ScanError::NotFound {
                path: path.to_path_buf(),
            });
        }
        self.open_handles.set(self.open_handles.get() + 1);
        self.total_opens.set(self.total_opens.get() + 1);
        Ok(folded)
    }

    fn subkey_names(&self, key: &Self::Key) -> Result<Vec<String>, ScanError> {
        self.check_readable(key)?;
        let prefix = format!("{key}\\");
        let names = self
            .keys
            .borrow()
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('\\'))
            })
            .map(|(_, entry)| entry.name.clone())
            .collect();
        Ok(names)
    }

    fn default_value(&self, key: &Self::Key) -> Result<Option<String>, ScanError> {
        self.check_readable(key)?;
        Ok(self.keys.borrow().get(key).and_then(|entry| entry.default.clone()))
    }

    fn close(&self, _key: Self::Key) {
        self.open_handles.set(self.open_handles.get().saturating_sub(1));
    }
}

fn fold(path: &RegistryPath) -> String {
    path.as_str().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::KeyScope;

    #[test]
    fn test_insert_creates_parents() {
        let registry = MemoryRegistry::new();
        registry.insert_key(r"HKLM\SOFTWARE\Classes\CLSID\{ABC}", Some("Visio"));

        let root =
            KeyScope::open(&registry, &RegistryPath::new(r"hklm\software\classes\clsid")).unwrap();
        assert_eq!(root.subkey_names().unwrap(), vec!["{ABC}".to_string()]);
        assert_eq!(root.default_value().unwrap(), None);
    }

    #[test]
    fn test_scope_closes_on_drop() {
        let registry = MemoryRegistry::new();
        registry.insert_key(r"HKCU\Software\Test", Some("x"));
        {
            let scope =
                KeyScope::open(&registry, &RegistryPath::new(r"HKCU\Software\Test")).unwrap();
            assert_eq!(registry.open_handles(), 1);
            assert_eq!(scope.default_value().unwrap().as_deref(), Some("x"));
        }
        assert_eq!(registry.open_handles(), 0);
    }

    #[test]
    fn test_denied_key() {
        let registry = MemoryRegistry::new();
        registry.insert_key(r"HKLM\SOFTWARE\Secret", None);
        registry.deny(r"HKLM\SOFTWARE\Secret");
        let err = registry.open(&RegistryPath::new(r"HKLM\SOFTWARE\Secret")).unwrap_err();
        assert!(matches!(err, ScanError::PermissionDenied { .. }));
        assert_eq!(registry.open_handles(), 0);
    }
}
