use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    DistributionClient,
    PlatformPackage,
    DirectoryHeuristic,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::DistributionClient => "steam",
            SourceKind::PlatformPackage => "store",
            SourceKind::DirectoryHeuristic => "folders",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::DistributionClient => "Steam",
            SourceKind::PlatformPackage => "App Store",
            SourceKind::DirectoryHeuristic => "Folder Scan",
        }
    }

    pub fn all() -> &'static [SourceKind] {
        &[
            SourceKind::DistributionClient,
            SourceKind::PlatformPackage,
            SourceKind::DirectoryHeuristic,
        ]
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "steam" | "client" => Ok(SourceKind::DistributionClient),
            "store" | "package" | "xbox" => Ok(SourceKind::PlatformPackage),
            "folders" | "heuristic" | "dir" => Ok(SourceKind::DirectoryHeuristic),
            _ => Err(format!(
                "Unknown source: {}. Use: steam, store, folders",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOS,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "linux")]
        return Platform::Linux;
        #[cfg(target_os = "macos")]
        return Platform::MacOS;
        #[cfg(target_os = "windows")]
        return Platform::Windows;
    }
}

/// Best-effort descriptive fields. Absent values are simply not reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A game reported by a single scan strategy, before merging.
///
/// `identity_key` is the source-assigned id (Steam app id, package family
/// name) and is empty for directory-heuristic results. `executable_path` is
/// `None` when no launch target could be resolved; the game is still
/// reported in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCandidate {
    pub source: SourceKind,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub identity_key: String,
    pub display_name: String,
    pub install_root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
    /// Shell invocation for packaged titles, e.g. `shell:AppsFolder\Fam_x!App`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_hint: Option<String>,
    #[serde(flatten)]
    pub metadata: CandidateMetadata,
}

impl GameCandidate {
    /// Creates a candidate. An empty `display_name` falls back to the last
    /// component of `install_root`.
    pub fn new(source: SourceKind, display_name: impl Into<String>, install_root: impl Into<PathBuf>) -> Self {
        let install_root = install_root.into();
        let mut display_name = display_name.into().trim().to_string();
        if display_name.is_empty() {
            display_name = dir_name(&install_root);
        }

        Self {
            source,
            identity_key: String::new(),
            display_name,
            install_root,
            executable_path: None,
            launch_hint: None,
            metadata: CandidateMetadata::default(),
        }
    }

    pub fn with_identity(mut self, key: impl Into<String>) -> Self {
        self.identity_key = key.into();
        self
    }

    pub fn with_executable(mut self, path: Option<PathBuf>) -> Self {
        self.executable_path = path;
        self
    }

    pub fn with_launch_hint(mut self, hint: impl Into<String>) -> Self {
        self.launch_hint = Some(hint.into());
        self
    }

    pub fn with_metadata(mut self, metadata: CandidateMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn has_identity(&self) -> bool {
        !self.identity_key.is_empty()
    }
}

/// Last path component as a display string, or the whole path if there is none.
pub(crate) fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Outcome of one scan strategy within a full scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub name: String,
    pub found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_time: DateTime<Utc>,
    pub games: Vec<GameCandidate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<StrategyReport>,
}

impl ScanResult {
    pub fn new(games: Vec<GameCandidate>) -> Self {
        Self {
            scan_time: Utc::now(),
            games,
            strategies: Vec::new(),
        }
    }

    /// Sorts games alphabetically by display name, case-insensitively.
    pub fn sort_by_name(&mut self) {
        self.games.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.install_root.cmp(&b.install_root))
        });
    }

    pub fn count_by_source(&self, source: SourceKind) -> usize {
        self.games.iter().filter(|g| g.source == source).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_display_name_falls_back_to_directory() {
        let game = GameCandidate::new(SourceKind::DirectoryHeuristic, "  ", "/games/Outer Wilds");
        assert_eq!(game.display_name, "Outer Wilds");
        assert!(!game.has_identity());
    }

    #[test]
    fn test_source_kind_from_str() {
        assert_eq!("steam".parse::<SourceKind>(), Ok(SourceKind::DistributionClient));
        assert_eq!("Store".parse::<SourceKind>(), Ok(SourceKind::PlatformPackage));
        assert_eq!("folders".parse::<SourceKind>(), Ok(SourceKind::DirectoryHeuristic));
        assert!("epic".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_sort_by_name_is_case_insensitive() {
        let mut result = ScanResult::new(vec![
            GameCandidate::new(SourceKind::DistributionClient, "portal", "/a"),
            GameCandidate::new(SourceKind::DistributionClient, "Celeste", "/b"),
            GameCandidate::new(SourceKind::DistributionClient, "Hades", "/c"),
        ]);
        result.sort_by_name();

        let names: Vec<_> = result.games.iter().map(|g| g.display_name.as_str()).collect();
        assert_eq!(names, vec!["Celeste", "Hades", "portal"]);
    }

    #[test]
    fn test_candidate_serializes_without_empty_fields() {
        let game = GameCandidate::new(SourceKind::DirectoryHeuristic, "Hades", "/games/Hades");
        let json = serde_json::to_value(&game).unwrap();

        assert_eq!(json["source"], "directory_heuristic");
        assert!(json.get("identity_key").is_none());
        assert!(json.get("executable_path").is_none());
        assert!(json.get("publisher").is_none());
    }
}
