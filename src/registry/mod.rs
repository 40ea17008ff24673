//! Read-only access to the host's key/value registry.
//!
//! Scanners only need two queries: list the subkeys under a path and read a
//! named string value. [`RegistryStore`] captures exactly that, so the same
//! scanning code runs against the Windows registry in production and an
//! in-memory [`MemoryRegistry`] in tests and on other platforms.
//!
//! Failures are never surfaced: a missing key lists no subkeys and a
//! missing or non-string value reads as `None`.

mod memory;
#[cfg(windows)]
mod windows;

pub use memory::MemoryRegistry;
#[cfg(windows)]
pub use windows::WindowsRegistry;

use std::sync::Arc;

/// Which hive a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Per-user settings (`HKEY_CURRENT_USER`).
    User,
    /// Machine-wide settings (`HKEY_LOCAL_MACHINE`).
    Machine,
}

pub trait RegistryStore: Send + Sync {
    /// Returns the names of the direct subkeys of `path`.
    fn list_subkeys(&self, scope: Scope, path: &str) -> Vec<String>;

    /// Returns the string value `name` stored under `path`.
    fn get_value(&self, scope: Scope, path: &str, name: &str) -> Option<String>;
}

/// Returns the registry of the running host.
///
/// On Windows this is the real registry; elsewhere an empty store, which
/// makes every registry-driven strategy report nothing.
pub fn system_registry() -> Arc<dyn RegistryStore> {
    #[cfg(windows)]
    {
        Arc::new(WindowsRegistry)
    }
    #[cfg(not(windows))]
    {
        Arc::new(MemoryRegistry::new())
    }
}
