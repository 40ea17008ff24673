//! Steam `appmanifest_<id>.acf` installation-state files.

use super::text_block::extract_value;
use crate::error::ScanError;
use std::fs;
use std::path::Path;

/// Bit in `StateFlags` meaning "fully installed".
pub const STATE_FULLY_INSTALLED: u32 = 4;

/// Bit in `StateFlags` meaning "uninstalled"; overrides the install bit.
pub const STATE_UNINSTALLED: u32 = 1;

/// A title counts as installed when the install bit is set and the
/// uninstalled bit is clear.
pub fn is_installed_state(state_flags: u32) -> bool {
    state_flags & STATE_FULLY_INSTALLED != 0 && state_flags & STATE_UNINSTALLED == 0
}

/// The fields of an app manifest needed to locate an installed title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppManifest {
    pub app_id: u32,
    pub name: String,
    pub install_dir: String,
    pub state_flags: u32,
    pub build_id: Option<String>,
}

impl AppManifest {
    pub fn is_installed(&self) -> bool {
        is_installed_state(self.state_flags)
    }
}

/// Parses manifest text.
///
/// Returns `Ok(None)` when the title is not fully installed, including
/// when `StateFlags` is missing or not a number. Missing or invalid
/// identity fields are reported as [`ScanError::Manifest`].
pub fn parse_app_manifest(path: &Path, content: &str) -> Result<Option<AppManifest>, ScanError> {
    let state_flags = extract_value(content, "StateFlags")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0);

    if !is_installed_state(state_flags) {
        return Ok(None);
    }

    let app_id = extract_value(content, "appid")
        .ok_or_else(|| ScanError::manifest(path, "missing appid"))?;
    let app_id = app_id
        .trim()
        .parse::<u32>()
        .map_err(|_| ScanError::manifest(path, format!("appid is not numeric: {:?}", app_id)))?;

    let install_dir = extract_value(content, "installdir")
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ScanError::manifest(path, "missing installdir"))?;

    let name = extract_value(content, "name")
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| install_dir.clone());

    let build_id = extract_value(content, "buildid").filter(|b| !b.is_empty());

    Ok(Some(AppManifest {
        app_id,
        name,
        install_dir,
        state_flags,
        build_id,
    }))
}

/// Reads and parses a manifest file from disk.
pub fn load_app_manifest(path: &Path) -> Result<Option<AppManifest>, ScanError> {
    let bytes = fs::read(path).map_err(|e| ScanError::io(path, e))?;
    let content = String::from_utf8_lossy(&bytes);
    parse_app_manifest(path, &content)
}

/// Returns true for file names of the form `appmanifest_<digits>.acf`.
pub fn is_app_manifest_name(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower
        .strip_prefix("appmanifest_")
        .and_then(|rest| rest.strip_suffix(".acf"))
        .is_some_and(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(flags: &str) -> String {
        format!(
            r#""AppState"
{{
	"appid"		"440"
	"name"		"Team Fortress 2"
	"StateFlags"		"{flags}"
	"installdir"		"Team Fortress 2"
	"buildid"		"8835751"
}}"#
        )
    }

    fn parse(content: &str) -> Result<Option<AppManifest>, ScanError> {
        parse_app_manifest(Path::new("appmanifest_440.acf"), content)
    }

    #[test]
    fn test_installed_manifest() {
        let app = parse(&manifest("4")).unwrap().unwrap();
        assert_eq!(app.app_id, 440);
        assert_eq!(app.name, "Team Fortress 2");
        assert_eq!(app.install_dir, "Team Fortress 2");
        assert_eq!(app.build_id.as_deref(), Some("8835751"));
        assert!(app.is_installed());
    }

    #[test]
    fn test_state_flags_with_install_bit() {
        for flags in ["4", "6", "12", "1028"] {
            assert!(parse(&manifest(flags)).unwrap().is_some(), "flags {flags}");
        }
    }

    #[test]
    fn test_state_flags_without_install_bit() {
        for flags in ["0", "1", "2", "5", "7", "13", "1026", "garbage", ""] {
            assert!(parse(&manifest(flags)).unwrap().is_none(), "flags {flags:?}");
        }
    }

    #[test]
    fn test_uninstalled_bit_overrides_install_bit() {
        assert!(is_installed_state(4));
        assert!(is_installed_state(6));
        assert!(is_installed_state(12));
        assert!(!is_installed_state(5));
        assert!(!is_installed_state(0));
    }

    #[test]
    fn test_missing_state_flags_is_not_installed() {
        let content = r#""AppState" { "appid" "10" "installdir" "Counter-Strike" }"#;
        assert!(parse(content).unwrap().is_none());
    }

    #[test]
    fn test_missing_appid_is_malformed() {
        let content = r#""AppState" { "StateFlags" "4" "installdir" "Game" }"#;
        assert!(matches!(parse(content), Err(ScanError::Manifest { .. })));
    }

    #[test]
    fn test_non_numeric_appid_is_malformed() {
        let content = r#""AppState" { "appid" "abc" "StateFlags" "4" "installdir" "Game" }"#;
        assert!(matches!(parse(content), Err(ScanError::Manifest { .. })));
    }

    #[test]
    fn test_missing_installdir_is_malformed() {
        let content = r#""AppState" { "appid" "10" "StateFlags" "4" }"#;
        assert!(matches!(parse(content), Err(ScanError::Manifest { .. })));
    }

    #[test]
    fn test_missing_name_falls_back_to_installdir() {
        let content = r#""AppState" { "appid" "10" "StateFlags" "4" "installdir" "Counter-Strike" }"#;
        let app = parse(content).unwrap().unwrap();
        assert_eq!(app.name, "Counter-Strike");
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let temp = tempfile::tempdir().unwrap();
        let result = load_app_manifest(&temp.path().join("appmanifest_1.acf"));
        assert!(matches!(result, Err(ScanError::Io { .. })));
    }

    #[test]
    fn test_manifest_file_names() {
        assert!(is_app_manifest_name("appmanifest_440.acf"));
        assert!(is_app_manifest_name("AppManifest_228980.ACF"));
        assert!(!is_app_manifest_name("appmanifest_.acf"));
        assert!(!is_app_manifest_name("appmanifest_440.acf.tmp"));
        assert!(!is_app_manifest_name("libraryfolders.vdf"));
    }
}
