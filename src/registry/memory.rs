use super::{RegistryStore, Scope};
use std::collections::BTreeMap;

/// An in-memory registry tree.
///
/// Keys are matched case-insensitively with `\` as separator, like the
/// Windows registry. Subkeys are listed in sorted order.
///
/// # Example
///
/// ```
/// use gamescan::registry::{MemoryRegistry, RegistryStore, Scope};
///
/// let registry = MemoryRegistry::new()
///     .with_value(Scope::User, r"Software\Valve\Steam", "SteamPath", "c:/program files (x86)/steam");
///
/// assert_eq!(
///     registry.get_value(Scope::User, r"software\valve\steam", "steampath").as_deref(),
///     Some("c:/program files (x86)/steam")
/// );
/// assert_eq!(registry.list_subkeys(Scope::User, "Software"), vec!["Valve"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    keys: BTreeMap<(Scope, String), Key>,
}

#[derive(Debug, Clone, Default)]
struct Key {
    display_name: String,
    values: BTreeMap<String, String>,
}

fn fold(path: &str) -> String {
    path.trim_matches('\\').to_lowercase()
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `path` and all of its parents.
    pub fn with_key(mut self, scope: Scope, path: &str) -> Self {
        self.insert_key(scope, path);
        self
    }

    /// Stores a string value, creating the key if needed.
    pub fn with_value(mut self, scope: Scope, path: &str, name: &str, value: &str) -> Self {
        self.insert_key(scope, path);
        if let Some(key) = self.keys.get_mut(&(scope, fold(path))) {
            key.values.insert(name.to_lowercase(), value.to_string());
        }
        self
    }

    fn insert_key(&mut self, scope: Scope, path: &str) {
        let mut current = String::new();
        for segment in path.split('\\').filter(|s| !s.is_empty()) {
            if !current.is_empty() {
                current.push('\\');
            }
            current.push_str(segment);
            self.keys
                .entry((scope, fold(&current)))
                .or_insert_with(|| Key {
                    display_name: segment.to_string(),
                    values: BTreeMap::new(),
                });
        }
    }
}

impl RegistryStore for MemoryRegistry {
    fn list_subkeys(&self, scope: Scope, path: &str) -> Vec<String> {
        let parent = fold(path);
        let prefix = if parent.is_empty() {
            String::new()
        } else {
            format!("{}\\", parent)
        };

        self.keys
            .iter()
            .filter(|((key_scope, key_path), _)| {
                *key_scope == scope
                    && key_path.starts_with(&prefix)
                    && !key_path[prefix.len()..].contains('\\')
                    && key_path.len() > prefix.len()
            })
            .map(|(_, key)| key.display_name.clone())
            .collect()
    }

    fn get_value(&self, scope: Scope, path: &str, name: &str) -> Option<String> {
        self.keys
            .get(&(scope, fold(path)))
            .and_then(|key| key.values.get(&name.to_lowercase()).cloned())
    }
}
