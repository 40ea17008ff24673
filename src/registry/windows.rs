use super::{RegistryStore, Scope};
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ};
use winreg::RegKey;

/// The live Windows registry, opened read-only.
pub struct WindowsRegistry;

impl WindowsRegistry {
    fn open(scope: Scope, path: &str) -> Option<RegKey> {
        let hive = match scope {
            Scope::User => RegKey::predef(HKEY_CURRENT_USER),
            Scope::Machine => RegKey::predef(HKEY_LOCAL_MACHINE),
        };
        hive.open_subkey_with_flags(path, KEY_READ).ok()
    }
}

impl RegistryStore for WindowsRegistry {
    fn list_subkeys(&self, scope: Scope, path: &str) -> Vec<String> {
        match Self::open(scope, path) {
            Some(key) => key.enum_keys().filter_map(|k| k.ok()).collect(),
            None => Vec::new(),
        }
    }

    fn get_value(&self, scope: Scope, path: &str, name: &str) -> Option<String> {
        let key = Self::open(scope, path)?;
        key.get_value::<String, _>(name).ok()
    }
}
