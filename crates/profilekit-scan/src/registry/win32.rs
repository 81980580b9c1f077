//! Win32 registry provider.

use ::windows::Win32::Foundation::{
    ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_NO_MORE_ITEMS, ERROR_PATH_NOT_FOUND,
    ERROR_SUCCESS, WIN32_ERROR,
};
use ::windows::Win32::System::Registry::{
    HKEY, HKEY_CLASSES_ROOT, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS, KEY_READ,
    REG_EXPAND_SZ, REG_SZ, REG_VALUE_TYPE, RegCloseKey, RegEnumKeyExW, RegOpenKeyExW,
    RegQueryValueExW,
};
use ::windows::core::{PCWSTR, PWSTR};

use profilekit_core::ScanError;

use super::{RegistryPath, RegistryProvider};

/// Longest key name the registry allows, plus the terminator.
const MAX_KEY_NAME: usize = 256;

/// An open Win32 key handle together with its path.
#[derive(Debug)]
pub struct OpenKey {
    handle: HKEY,
    path: RegistryPath,
}

/// The live Windows registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRegistry;

impl SystemRegistry {
    /// Create the provider.
    pub fn new() -> Self {
        Self
    }
}

impl RegistryProvider for SystemRegistry {
    type Key = OpenKey;

    fn open(&self, path: &RegistryPath) -> Result<Self::Key, ScanError> {
        let root = match path.hive() {
            "HKEY_LOCAL_MACHINE" => HKEY_LOCAL_MACHINE,
            "HKEY_CURRENT_USER" => HKEY_CURRENT_USER,
            "HKEY_CLASSES_ROOT" => HKEY_CLASSES_ROOT,
            "HKEY_USERS" => HKEY_USERS,
            _ => {
                return Err(ScanError::NotFound {
                    path: path.to_path_buf(),
                });
            }
        };

        let subkey = to_wide(path.subkey());
        let mut handle = HKEY::default();
        // SAFETY: `subkey` is NUL-terminated and outlives the call; `handle`
        // is a valid out pointer.
        let status =
            unsafe { RegOpenKeyExW(root, PCWSTR(subkey.as_ptr()), 0, KEY_READ, &mut handle) };
        check(status, path)?;

        Ok(OpenKey {
            handle,
            path: path.clone(),
        })
    }

    fn subkey_names(&self, key: &Self::Key) -> Result<Vec<String>, ScanError> {
        let mut names = Vec::new();
        let mut index = 0;

        loop {
            let mut buf = [0u16; MAX_KEY_NAME];
            let mut len = MAX_KEY_NAME as u32;
            // SAFETY: `buf` holds `len` UTF-16 units and `len` is updated in place.
            let status = unsafe {
                RegEnumKeyExW(
                    key.handle,
                    index,
                    PWSTR(buf.as_mut_ptr()),
                    &mut len,
                    None,
                    PWSTR::null(),
                    None,
                    None,
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            check(status, &key.path)?;

            names.push(String::from_utf16_lossy(&buf[..len as usize]));
            index += 1;
        }

        Ok(names)
    }

    fn default_value(&self, key: &Self::Key) -> Result<Option<String>, ScanError> {
        let mut value_type = REG_VALUE_TYPE::default();
        let mut size = 0u32;
        // SAFETY: a null value name selects the default value; only the type
        // and size are requested.
        let status = unsafe {
            RegQueryValueExW(
                key.handle,
                PCWSTR::null(),
                None,
                Some(&mut value_type),
                None,
                Some(&mut size),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        check(status, &key.path)?;

        if value_type != REG_SZ && value_type != REG_EXPAND_SZ {
            return Ok(None);
        }

        let mut buf = vec![0u16; (size as usize).div_ceil(2) + 1];
        let mut byte_len = (buf.len() * 2) as u32;
        // SAFETY: `buf` is `byte_len` bytes long.
        let status = unsafe {
            RegQueryValueExW(
                key.handle,
                PCWSTR::null(),
                None,
                None,
                Some(buf.as_mut_ptr().cast::<u8>()),
                Some(&mut byte_len),
            )
        };
        check(status, &key.path)?;

        let units = (byte_len as usize / 2).min(buf.len());
        let text = String::from_utf16_lossy(&buf[..units]);
        Ok(Some(text.trim_end_matches('\0').to_string()))
    }

    fn close(&self, key: Self::Key) {
        // SAFETY: the handle came from a successful RegOpenKeyExW and is
        // closed exactly once because `close` takes ownership.
        let _ = unsafe { RegCloseKey(key.handle) };
    }
}

fn check(status: WIN32_ERROR, path: &RegistryPath) -> Result<(), ScanError> {
    if status == ERROR_SUCCESS {
        return Ok(());
    }
    let path = path.to_path_buf();
    Err(if status == ERROR_FILE_NOT_FOUND || status == ERROR_PATH_NOT_FOUND {
        ScanError::NotFound { path }
    } else if status == ERROR_ACCESS_DENIED {
        ScanError::PermissionDenied { path }
    } else {
        ScanError::Registry {
            path,
            message: format!("Win32 error {}", status.0),
        }
    })
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}
