//! Configuration file handling.
//!
//! This module provides loading and saving of gamescan configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/gamescan/config.toml`
//! - macOS: `~/Library/Application Support/gamescan/config.toml`
//! - Windows: `%APPDATA%\gamescan\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! default_format = "table"
//! parallel = true
//! max_workers = 0
//! heuristic_depth = 2
//! steam_path = "D:\\Steam"
//! extra_library_roots = ["E:\\SteamLibrary\\steamapps"]
//! extra_scan_roots = ["E:\\Games"]
//!
//! [ignore]
//! titles = ["*Soundtrack*", "Steamworks Common Redistributables"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tokio::sync::Semaphore;

use crate::resolver::ExecutableResolver;

/// Application configuration.
///
/// This struct represents all configurable options for gamescan.
/// It can be loaded from a TOML file or created with default values.
///
/// # Example
///
/// ```no_run
/// use gamescan::Config;
///
/// // Load from file (or use defaults if file doesn't exist)
/// let config = Config::load().unwrap();
///
/// println!("Heuristic depth: {}", config.heuristic_depth);
/// println!("Parallel: {}", config.parallel);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default output format when no `--format` flag is provided.
    ///
    /// Valid values: "table", "json"
    /// Default: "table"
    pub default_format: String,

    /// Whether scan strategies run concurrently.
    ///
    /// Default: true
    pub parallel: bool,

    /// Size of the worker pool used by folder scans. 0 uses the host's
    /// available parallelism.
    ///
    /// Default: 0
    pub max_workers: usize,

    /// Directory levels below a folder to search for executables when no
    /// manifest describes it.
    ///
    /// Default: 2
    pub heuristic_depth: usize,

    /// Steam install directory. Overrides the registry and the
    /// conventional locations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steam_path: Option<PathBuf>,

    /// Additional Steam library roots (`steamapps` directories).
    pub extra_library_roots: Vec<PathBuf>,

    /// Additional folders whose subdirectories are scanned as games.
    pub extra_scan_roots: Vec<PathBuf>,

    /// Folder names, relative to each drive root, that hold installed games.
    pub container_folders: Vec<String>,

    /// File extensions treated as executables.
    ///
    /// Default: `["exe"]`
    pub executable_extensions: Vec<String>,

    /// Extra file-name fragments that disqualify an executable, added to
    /// the built-in uninstaller/installer/redistributable list.
    pub excluded_tokens: Vec<String>,

    /// Ignore list configuration for suppressing unwanted titles.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Configuration for ignoring specific titles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Display names to drop from results.
    ///
    /// Matching is case-insensitive and supports `*` wildcards
    /// (e.g. "*Soundtrack", "Proton *").
    pub titles: Vec<String>,
}

impl IgnoreConfig {
    /// Check if a title should be ignored.
    pub fn should_ignore_title(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.titles.iter().any(|pattern| {
            let pattern = pattern.to_lowercase();
            if pattern.contains('*') {
                glob_match(&pattern, &title)
            } else {
                pattern == title
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    // Check prefix (before first *)
    if !parts[0].is_empty() {
        if !remaining.starts_with(parts[0]) {
            return false;
        }
        remaining = &remaining[parts[0].len()..];
    }

    // Check suffix (after last *)
    let last_part = parts[parts.len() - 1];
    if !last_part.is_empty() {
        if !remaining.ends_with(last_part) {
            return false;
        }
        remaining = &remaining[..remaining.len() - last_part.len()];
    }

    // Check middle parts
    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_format: "table".to_string(),
            parallel: true,
            max_workers: 0,
            heuristic_depth: 2,
            steam_path: None,
            extra_library_roots: Vec::new(),
            extra_scan_roots: Vec::new(),
            container_folders: vec![
                "XboxGames".to_string(),
                "ModifiableWindowsApps".to_string(),
                r"Program Files\ModifiableWindowsApps".to_string(),
            ],
            executable_extensions: vec!["exe".to_string()],
            excluded_tokens: Vec::new(),
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file.
    ///
    /// If the config file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parses configuration from TOML text. Missing fields take defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Saves the configuration to the config file.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    ///
    /// # Example
    ///
    /// ```
    /// use gamescan::Config;
    ///
    /// let path = Config::config_path();
    /// println!("Config file: {}", path.display());
    /// ```
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gamescan")
            .join("config.toml")
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Number of workers for folder scans, between one and the largest
    /// permit count a semaphore accepts.
    pub fn worker_count(&self) -> usize {
        let workers = if self.max_workers > 0 {
            self.max_workers
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        };
        workers.min(Semaphore::MAX_PERMITS)
    }

    /// Builds the executable resolver described by this configuration.
    pub fn executable_resolver(&self) -> ExecutableResolver {
        let mut resolver = ExecutableResolver::new();
        if !self.executable_extensions.is_empty() {
            resolver = resolver.with_extensions(&self.executable_extensions);
        }
        resolver.with_extra_exclusions(&self.excluded_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("portal", "portal"));
        assert!(!glob_match("portal", "portal 2"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("proton*", "proton"));
        assert!(glob_match("proton*", "proton 8.0"));
        assert!(glob_match("proton*", "proton experimental"));
        assert!(!glob_match("proton*", "steam linux runtime"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*soundtrack", "celeste soundtrack"));
        assert!(!glob_match("*soundtrack", "soundtrack pack"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*redist*", "steamworks common redistributables"));
        assert!(!glob_match("*redist*", "hades"));
    }

    #[test]
    fn test_ignore_titles_case_insensitive() {
        let config = IgnoreConfig {
            titles: vec![
                "Steamworks Common Redistributables".to_string(),
                "Proton *".to_string(),
            ],
        };

        assert!(config.should_ignore_title("steamworks common redistributables"));
        assert!(config.should_ignore_title("Proton 8.0"));
        assert!(!config.should_ignore_title("Portal 2"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.default_format, "table");
        assert!(config.parallel);
        assert_eq!(config.heuristic_depth, 2);
        assert_eq!(config.executable_extensions, vec!["exe"]);
        assert_eq!(config.container_folders.len(), 3);
        assert!(config.ignore.titles.is_empty());
        assert!(config.worker_count() >= 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
heuristic_depth = 3
max_workers = 2
extra_scan_roots = ["/srv/games"]

[ignore]
titles = ["*Soundtrack"]
"#,
        )
        .unwrap();

        assert_eq!(config.heuristic_depth, 3);
        assert_eq!(config.worker_count(), 2);
        assert_eq!(config.extra_scan_roots, vec![PathBuf::from("/srv/games")]);
        assert_eq!(config.default_format, "table");
        assert!(config.ignore.should_ignore_title("Hades Soundtrack"));
    }

    #[test]
    fn test_worker_count_fits_a_semaphore() {
        let config = Config::from_toml("max_workers = 9223372036854775807").unwrap();
        assert_eq!(config.worker_count(), Semaphore::MAX_PERMITS);

        let config = Config {
            max_workers: Semaphore::MAX_PERMITS + 1,
            ..Config::default()
        };
        assert_eq!(config.worker_count(), Semaphore::MAX_PERMITS);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(Config::from_toml("heuristic_depth = \"deep\"").is_err());
    }

    #[test]
    fn test_default_config_round_trips() {
        let text = Config::generate_default_config();
        let config = Config::from_toml(&text).unwrap();
        assert_eq!(config.container_folders, Config::default().container_folders);
    }
}
