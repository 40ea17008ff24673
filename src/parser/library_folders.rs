//! Steam's `libraryfolders.vdf` library index.
//!
//! Two layouts exist in the wild. Current clients write one numbered block
//! per library with a `"path"` entry:
//!
//! ```text
//! "libraryfolders"
//! {
//!     "0" { "path" "C:\\Program Files (x86)\\Steam" ... }
//!     "1" { "path" "D:\\SteamLibrary" ... }
//! }
//! ```
//!
//! Older clients stored the path directly under the number:
//! `"1" "D:\\SteamLibrary"`. Both are read.

use super::text_block::{extract_all, unescape};
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

fn legacy_entry() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"(?m)^[ \t]*"\d+"[ \t]+"((?:[^"\\]|\\.)*)"[ \t]*\r?$"#).ok())
        .as_ref()
}

/// Returns every library directory declared in the index, in file order.
///
/// Empty entries are dropped. Paths are returned as written; callers
/// check existence and deduplicate.
pub fn parse_library_folders(content: &str) -> Vec<PathBuf> {
    let mut paths: Vec<String> = extract_all(content, "path");

    // Current layouts also contain `"<appid>" "<size>"` pairs under "apps",
    // which look like legacy entries.
    if paths.is_empty() {
        if let Some(pattern) = legacy_entry() {
            paths.extend(
                pattern
                    .captures_iter(content)
                    .filter_map(|caps| caps.get(1))
                    .map(|m| unescape(m.as_str())),
            );
        }
    }

    paths
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_layout() {
        let content = r#"
"libraryfolders"
{
	"0"
	{
		"path"		"C:\\Program Files (x86)\\Steam"
		"label"		""
		"apps"
		{
			"228980"		"396657487"
		}
	}
	"1"
	{
		"path"		"D:\\SteamLibrary"
		"label"		"Games"
	}
}
"#;
        assert_eq!(
            parse_library_folders(content),
            vec![
                PathBuf::from(r"C:\Program Files (x86)\Steam"),
                PathBuf::from(r"D:\SteamLibrary"),
            ]
        );
    }

    #[test]
    fn test_legacy_layout() {
        let content = r#"
"LibraryFolders"
{
	"TimeNextStatsReport"		"1571065437"
	"ContentStatsID"		"-4563564864"
	"1"		"D:\\SteamLibrary"
	"2"		"E:\\Games\\Steam"
}
"#;
        assert_eq!(
            parse_library_folders(content),
            vec![PathBuf::from(r"D:\SteamLibrary"), PathBuf::from(r"E:\Games\Steam")]
        );
    }

    #[test]
    fn test_legacy_entries_must_fill_a_line() {
        let content = "\"LibraryFolders\"\r\n{\r\n\t\"TimeNextStatsReport\"\t\t\"1571065437\"\r\n\t\"ContentStatsID\"\t\t\"-1\"\r\n\t\"1\"\t\t\"F:\\\\Steam\"\r\n}\r\n";
        assert_eq!(parse_library_folders(content), vec![PathBuf::from(r"F:\Steam")]);
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(parse_library_folders("not a vdf file").is_empty());
        assert!(parse_library_folders("").is_empty());
    }
}
