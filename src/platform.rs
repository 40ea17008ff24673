//! Cross-platform path resolution.
//!
//! This module provides the conventional locations gamescan looks at when
//! the registry has nothing to say, plus the path normalization used to
//! compare install roots and executables across scan strategies.

use crate::model::Platform;
use std::path::{Path, PathBuf};

/// Returns the conventional Steam install directories for this platform.
///
/// Platform-specific locations:
/// - Windows: `C:\Program Files (x86)\Steam`, `C:\Program Files\Steam`
/// - Linux: `~/.steam/steam`, `~/.local/share/Steam`
/// - macOS: `~/Library/Application Support/Steam`
///
/// Directories are returned whether or not they exist.
pub fn steam_fallback_dirs() -> Vec<PathBuf> {
    match Platform::current() {
        Platform::Windows => vec![
            PathBuf::from(r"C:\Program Files (x86)\Steam"),
            PathBuf::from(r"C:\Program Files\Steam"),
        ],
        Platform::Linux => {
            let mut dirs_found = Vec::new();
            if let Some(home) = dirs::home_dir() {
                dirs_found.push(home.join(".steam").join("steam"));
            }
            if let Some(data) = dirs::data_dir() {
                dirs_found.push(data.join("Steam"));
            }
            dirs_found
        }
        Platform::MacOS => dirs::home_dir()
            .map(|home| {
                vec![home
                    .join("Library")
                    .join("Application Support")
                    .join("Steam")]
            })
            .unwrap_or_default(),
    }
}

/// Returns the root of every mounted drive letter (`C:\`, `D:\`, ...).
///
/// Only meaningful on Windows; other platforms have no drive letters and
/// get an empty list.
pub fn drive_roots() -> Vec<PathBuf> {
    match Platform::current() {
        Platform::Windows => (b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .filter(|root| root.is_dir())
            .collect(),
        _ => Vec::new(),
    }
}

/// Returns a comparison key for a path: resolved, separator-normalized and
/// lowercased.
///
/// Existing paths are canonicalized through the filesystem (symlinks, `..`).
/// Paths that do not exist, such as a Windows path seen on another host,
/// are normalized lexically so that `C:\Games\TF2\hl2.exe` and
/// `c:/games/tf2/HL2.EXE` produce the same key.
pub fn path_key(path: &Path) -> String {
    let resolved = std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| path.to_string_lossy().to_string());
    normalize_lexically(strip_verbatim(&resolved))
}

/// Removes the `\\?\` prefix Windows adds to canonicalized paths.
fn strip_verbatim(path: &str) -> &str {
    path.strip_prefix(r"\\?\UNC\")
        .or_else(|| path.strip_prefix(r"\\?\"))
        .unwrap_or(path)
}

fn normalize_lexically(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                // Never pop a drive prefix like `c:`.
                if parts.last().is_some_and(|p| !p.ends_with(':')) {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    let joined = if absolute { format!("/{}", joined) } else { joined };
    joined.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_key_ignores_case_and_separators() {
        assert_eq!(
            path_key(Path::new(r"C:\Games\TF2\hl2.exe")),
            path_key(Path::new(r"c:\games\tf2\HL2.EXE"))
        );
        assert_eq!(
            path_key(Path::new(r"C:\Games\TF2\hl2.exe")),
            path_key(Path::new("C:/Games/TF2/hl2.exe"))
        );
    }

    #[test]
    fn test_path_key_resolves_parent_segments() {
        assert_eq!(
            path_key(Path::new(r"D:\Steam\steamapps\..\steamapps\.\common")),
            "d:/steam/steamapps/common"
        );
        assert_eq!(path_key(Path::new(r"C:\..\Games")), "c:/games");
    }

    #[test]
    fn test_path_key_trailing_separator() {
        assert_eq!(
            path_key(Path::new("/nonexistent/Library/")),
            path_key(Path::new("/nonexistent/library"))
        );
    }

    #[test]
    fn test_path_key_canonicalizes_existing_paths() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("Lib");
        std::fs::create_dir(&nested).unwrap();

        let indirect = temp.path().join("Lib").join("..").join("Lib");
        assert_eq!(path_key(&indirect), path_key(&nested));
    }

    #[test]
    fn test_strip_verbatim() {
        assert_eq!(strip_verbatim(r"\\?\C:\Games"), r"C:\Games");
        assert_eq!(strip_verbatim(r"C:\Games"), r"C:\Games");
    }
}
