use crate::model::{dir_name, GameCandidate, Platform, SourceKind};
use crate::parser::appx::{find_manifest, load_package_manifest};
use crate::platform::{drive_roots, path_key};
use crate::registry::Scope;
use crate::resolver::ResolveOptions;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::packages::candidate_from_manifest;
use super::ScanContext;

/// Machine-wide install roots registered by the gaming services runtime.
const MACHINE_ROOTS_KEY: &str = r"SOFTWARE\Microsoft\GamingServices\PackageRepository\Root";
const MACHINE_ROOT_VALUE: &str = "Root";

/// Per-user install roots chosen in the store app.
const USER_ROOTS_KEY: &str = r"Software\Microsoft\GamingServices\GameInstallRoots";
const USER_ROOT_VALUE: &str = "Path";

/// Trailing words that say nothing about the title.
const GENERIC_SUFFIXES: &[&str] = &[
    "pc",
    "win",
    "win32",
    "win64",
    "windows",
    "x64",
    "x86",
    "game",
    "edition",
    "definitive",
    "goty",
    "remastered",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RootDiscovery {
    /// Container folders on every drive plus configured roots.
    Drives,
    /// Roots declared in the registry.
    Registry,
}

/// Finds games in folders that no manifest describes.
///
/// Each subdirectory of a discovered root is one unit of work. Units run
/// on a bounded pool of blocking workers; a unit that holds a package
/// manifest is parsed like a store package, anything else is resolved by
/// searching for its best executable.
pub struct DirectoryHeuristicScanner {
    discovery: RootDiscovery,
}

impl DirectoryHeuristicScanner {
    /// Scans `<drive>:\<container>` for each configured container folder,
    /// plus `extra_scan_roots` from the config.
    pub fn drive_roots() -> Self {
        Self {
            discovery: RootDiscovery::Drives,
        }
    }

    /// Scans the install roots the gaming services runtime records in the
    /// registry.
    pub fn registry_roots() -> Self {
        Self {
            discovery: RootDiscovery::Registry,
        }
    }

    fn discover_roots(&self, ctx: &ScanContext) -> Vec<PathBuf> {
        let candidates: Vec<PathBuf> = match self.discovery {
            RootDiscovery::Drives => drive_roots()
                .iter()
                .flat_map(|drive| {
                    ctx.config
                        .container_folders
                        .iter()
                        .map(move |folder| drive.join(folder))
                })
                .chain(ctx.config.extra_scan_roots.iter().cloned())
                .collect(),
            RootDiscovery::Registry => {
                let mut roots = registry_values(ctx, Scope::Machine, MACHINE_ROOTS_KEY, MACHINE_ROOT_VALUE);
                roots.extend(registry_values(ctx, Scope::User, USER_ROOTS_KEY, USER_ROOT_VALUE));
                roots
            }
        };

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|root| root.is_dir())
            .filter(|root| seen.insert(path_key(root)))
            .collect()
    }
}

#[async_trait]
impl super::Scanner for DirectoryHeuristicScanner {
    fn name(&self) -> &'static str {
        match self.discovery {
            RootDiscovery::Drives => "Drive Game Folders",
            RootDiscovery::Registry => "Registry Install Roots",
        }
    }

    fn source(&self) -> SourceKind {
        SourceKind::DirectoryHeuristic
    }

    fn supported_platforms(&self) -> &[Platform] {
        match self.discovery {
            RootDiscovery::Drives => &[Platform::Windows, Platform::MacOS, Platform::Linux],
            RootDiscovery::Registry => &[Platform::Windows],
        }
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<GameCandidate>> {
        let roots = self.discover_roots(ctx);
        if roots.is_empty() {
            debug!(scanner = self.name(), "no roots to scan");
            return Ok(Vec::new());
        }

        let unit_ctx = ctx.clone();
        let units = tokio::task::spawn_blocking(move || collect_units(&roots, &unit_ctx)).await?;
        info!(scanner = self.name(), units = units.len(), "scanning folders");

        scan_units(units, ctx).await
    }
}

fn registry_values(ctx: &ScanContext, scope: Scope, key: &str, value: &str) -> Vec<PathBuf> {
    ctx.registry
        .list_subkeys(scope, key)
        .into_iter()
        .filter_map(|sub| ctx.registry.get_value(scope, &format!(r"{}\{}", key, sub), value))
        .map(|path| PathBuf::from(path.trim()))
        .filter(|path| !path.as_os_str().is_empty())
        .collect()
}

/// Expands roots into the directories scanned as individual games.
/// A root that is itself a package counts as one unit.
fn collect_units(roots: &[PathBuf], ctx: &ScanContext) -> Vec<PathBuf> {
    let mut units = Vec::new();

    for root in roots {
        if ctx.is_cancelled() {
            break;
        }

        if find_manifest(root).is_some() {
            units.push(root.clone());
            continue;
        }

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "cannot list folder");
                continue;
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| entry.path())
            .collect();
        dirs.sort();
        units.extend(dirs);
    }

    units
}

async fn scan_units(units: Vec<PathBuf>, ctx: &ScanContext) -> Result<Vec<GameCandidate>> {
    let workers = Arc::new(Semaphore::new(ctx.config.worker_count()));
    let seen = Arc::new(Mutex::new(HashSet::new()));
    let mut handles = Vec::with_capacity(units.len());

    for dir in units {
        if ctx.is_cancelled() {
            debug!("folder scan cancelled");
            break;
        }

        let permit = workers.clone().acquire_owned().await?;
        let ctx = ctx.clone();
        let seen = seen.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            process_dir(&dir, &ctx).filter(|game| claim(&seen, game))
        }));
    }

    let mut games = Vec::new();
    for result in join_all(handles).await {
        match result {
            Ok(Some(game)) => games.push(game),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "folder worker failed"),
        }
    }
    Ok(games)
}

/// Records `game` in the shared set; false if another worker got there first.
fn claim(seen: &Mutex<HashSet<String>>, game: &GameCandidate) -> bool {
    let key = if game.has_identity() {
        format!("id:{}:{}", game.source.as_str(), game.identity_key.to_lowercase())
    } else if let Some(exe) = &game.executable_path {
        format!("exe:{}", path_key(exe))
    } else {
        format!("root:{}", path_key(&game.install_root))
    };

    seen.lock().unwrap_or_else(|e| e.into_inner()).insert(key)
}

fn process_dir(dir: &Path, ctx: &ScanContext) -> Option<GameCandidate> {
    if let Some(manifest_path) = find_manifest(dir) {
        let manifest = match load_package_manifest(&manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping folder");
                return None;
            }
        };
        if !manifest.is_interactive() {
            return None;
        }
        let package_root = manifest_path.parent().unwrap_or(dir);
        return Some(candidate_from_manifest(package_root, &manifest, None, ctx));
    }

    let name = dir_name(dir);
    let hint = name_hint_from_dir(&name);
    let options = ResolveOptions::depth_limited(ctx.config.heuristic_depth);
    let Some(exe) = ctx.resolver.resolve(dir, &hint, options, &ctx.cancel) else {
        debug!(dir = %dir.display(), "no executable found");
        return None;
    };

    Some(GameCandidate::new(SourceKind::DirectoryHeuristic, name, dir).with_executable(Some(exe)))
}

/// Derives an executable name hint from a folder name.
///
/// Keeps the part before the first underscore and drops trailing generic
/// words such as platform or edition markers, never the last word.
///
/// # Example
///
/// ```
/// use gamescan::scanner::name_hint_from_dir;
///
/// assert_eq!(name_hint_from_dir("Celeste_1.4.0.0_x64"), "Celeste");
/// assert_eq!(name_hint_from_dir("Age of Empires II Definitive Edition"), "Age of Empires II");
/// ```
pub fn name_hint_from_dir(dir_name: &str) -> String {
    let first = dir_name.split('_').next().unwrap_or(dir_name);
    let mut words: Vec<&str> = first
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .collect();

    while words.len() > 1 {
        let last = words[words.len() - 1].to_lowercase();
        if !GENERIC_SUFFIXES.contains(&last.as_str()) {
            break;
        }
        words.pop();
    }

    if words.is_empty() {
        return first.trim().to_string();
    }
    words.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::MemoryRegistry;
    use crate::scanner::packages::PACKAGES_KEY;
    use crate::scanner::{PackageRegistryScanner, Scanner};
    use std::fs::File;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn touch(path: &Path, size: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap().set_len(size).unwrap();
    }

    fn context_with_roots(roots: Vec<PathBuf>) -> ScanContext {
        let config = Config {
            extra_scan_roots: roots,
            max_workers: 2,
            ..Config::default()
        };
        ScanContext::new(config, Arc::new(MemoryRegistry::new()))
    }

    fn write_manifest(dir: &Path, name: &str, exe: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("AppxManifest.xml"),
            format!(
                r#"<Package><Identity Name="{name}" Publisher="CN=Studio" Version="2.0.0.0" />
<Properties><DisplayName>{name}</DisplayName></Properties>
<Applications><Application Id="App" Executable="{exe}" /></Applications></Package>"#
            ),
        )
        .unwrap();
    }

    fn sorted_names(games: &[GameCandidate]) -> Vec<String> {
        let mut names: Vec<String> = games.iter().map(|g| g.display_name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_name_hint_from_dir() {
        assert_eq!(name_hint_from_dir("Hollow Knight"), "Hollow Knight");
        assert_eq!(name_hint_from_dir("Celeste_PC"), "Celeste");
        assert_eq!(name_hint_from_dir("Doom-Eternal-Win64"), "Doom Eternal");
        assert_eq!(name_hint_from_dir("Skyrim Remastered GOTY"), "Skyrim");
        assert_eq!(name_hint_from_dir("Game"), "Game");
        assert_eq!(name_hint_from_dir("PC Game"), "PC");
    }

    #[test]
    fn test_claim_first_writer_wins() {
        let seen = Mutex::new(HashSet::new());
        let a = GameCandidate::new(SourceKind::DirectoryHeuristic, "A", "/games/a")
            .with_executable(Some(PathBuf::from("/games/a/a.exe")));
        let b = GameCandidate::new(SourceKind::DirectoryHeuristic, "B", "/games/b")
            .with_executable(Some(PathBuf::from("/GAMES/A/A.EXE")));
        let keyed = GameCandidate::new(SourceKind::PlatformPackage, "C", "/games/c").with_identity("Studio.C");
        let keyed_again = GameCandidate::new(SourceKind::PlatformPackage, "C", "/other/c").with_identity("studio.c");

        assert!(claim(&seen, &a));
        assert!(!claim(&seen, &b));
        assert!(claim(&seen, &keyed));
        assert!(!claim(&seen, &keyed_again));
    }

    #[tokio::test]
    async fn test_scans_subdirectories_of_configured_roots() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Games");

        touch(&root.join("Hollow Knight").join("hollow_knight.exe"), 1024);
        touch(&root.join("Hollow Knight").join("unins000.exe"), 1024);
        touch(&root.join("Celeste_PC").join("Celeste.exe"), 1024);
        touch(&root.join("Celeste_PC").join("Celeste-Launcher.exe"), 1024);
        fs::create_dir_all(root.join("Empty")).unwrap();
        touch(&root.join("OnlyInstaller").join("setup.exe"), 1024);

        let puzzle = root.join("Studio.Puzzle_2.0.0.0_x64__pub");
        write_manifest(&puzzle, "Studio.Puzzle", "Puzzle.exe");
        touch(&puzzle.join("Puzzle.exe"), 1024);

        let broken = root.join("Broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("AppxManifest.xml"), "not xml").unwrap();

        let ctx = context_with_roots(vec![root.clone()]);
        let games = DirectoryHeuristicScanner::drive_roots().scan(&ctx).await.unwrap();

        assert_eq!(sorted_names(&games), vec!["Celeste_PC", "Hollow Knight", "Studio.Puzzle"]);

        let knight = games.iter().find(|g| g.display_name == "Hollow Knight").unwrap();
        assert_eq!(knight.source, SourceKind::DirectoryHeuristic);
        assert!(knight.identity_key.is_empty());
        assert_eq!(knight.executable_path, Some(root.join("Hollow Knight").join("hollow_knight.exe")));

        let celeste = games.iter().find(|g| g.display_name == "Celeste_PC").unwrap();
        assert_eq!(celeste.executable_path, Some(root.join("Celeste_PC").join("Celeste.exe")));

        let package = games.iter().find(|g| g.display_name == "Studio.Puzzle").unwrap();
        assert_eq!(package.source, SourceKind::PlatformPackage);
        assert_eq!(package.identity_key, "Studio.Puzzle_rms0rf98tqdkg");
        assert_eq!(
            package.launch_hint.as_deref(),
            Some(r"shell:AppsFolder\Studio.Puzzle_rms0rf98tqdkg!App")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_workers_report_one_copy_per_identity() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Games");
        for copy in ["A", "B", "C", "D", "E", "F", "G", "H"] {
            let dir = root.join(format!("Twin {}", copy));
            write_manifest(&dir, "Studio.Twin", "Twin.exe");
            touch(&dir.join("Twin.exe"), 1024);
        }

        let config = Config {
            extra_scan_roots: vec![root],
            max_workers: 4,
            ..Config::default()
        };
        let ctx = ScanContext::new(config, Arc::new(MemoryRegistry::new()));
        let games = DirectoryHeuristicScanner::drive_roots().scan(&ctx).await.unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].identity_key, "Studio.Twin_rms0rf98tqdkg");
    }

    #[tokio::test]
    async fn test_package_found_on_disk_merges_with_registry_entry() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("XboxGames");
        let puzzle = root.join("Puzzle");
        write_manifest(&puzzle, "Studio.Puzzle", "Puzzle.exe");
        touch(&puzzle.join("Puzzle.exe"), 1024);

        let registry = MemoryRegistry::new().with_value(
            Scope::User,
            &format!(r"{}\Studio.Puzzle_2.0.0.0_x64__rms0rf98tqdkg", PACKAGES_KEY),
            "PackageRootFolder",
            &puzzle.to_string_lossy(),
        );
        let config = Config {
            extra_scan_roots: vec![root],
            ..Config::default()
        };
        let ctx = ScanContext::new(config, Arc::new(registry));

        let from_registry = PackageRegistryScanner.scan(&ctx).await.unwrap();
        let from_disk = DirectoryHeuristicScanner::drive_roots().scan(&ctx).await.unwrap();
        assert_eq!(from_registry.len(), 1);
        assert_eq!(from_disk.len(), 1);
        assert_eq!(from_registry[0].identity_key, from_disk[0].identity_key);

        let merged = crate::dedup::merge(vec![from_registry, from_disk]);
        assert_eq!(merged.len(), 1);
    }

    #[tokio::test]
    async fn test_root_that_is_a_package_is_one_unit() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Racer");
        write_manifest(&root.join("Content"), "Studio.Racer", r"bin\Racer.exe");
        touch(&root.join("Content").join("bin").join("Racer.exe"), 1024);

        let ctx = context_with_roots(vec![root.clone()]);
        let games = DirectoryHeuristicScanner::drive_roots().scan(&ctx).await.unwrap();

        assert_eq!(games.len(), 1);
        assert_eq!(games[0].install_root, root.join("Content"));
        assert_eq!(
            games[0].executable_path,
            Some(root.join("Content").join("bin").join("Racer.exe"))
        );
    }

    #[tokio::test]
    async fn test_depth_limit_applies_without_manifest() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Games");
        touch(&root.join("Shallow").join("a").join("b").join("Shallow.exe"), 1024);
        touch(&root.join("Deep").join("a").join("b").join("c").join("Deep.exe"), 1024);

        let ctx = context_with_roots(vec![root]);
        let games = DirectoryHeuristicScanner::drive_roots().scan(&ctx).await.unwrap();

        assert_eq!(sorted_names(&games), vec!["Shallow"]);
    }

    #[tokio::test]
    async fn test_duplicate_roots_scanned_once() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Games");
        touch(&root.join("Hades").join("Hades.exe"), 1024);

        let ctx = context_with_roots(vec![root.clone(), root.join(".").join("..").join("Games")]);
        let games = DirectoryHeuristicScanner::drive_roots().scan(&ctx).await.unwrap();

        assert_eq!(games.len(), 1);
    }

    #[tokio::test]
    async fn test_registry_declared_roots() {
        let temp = TempDir::new().unwrap();
        let machine_root = temp.path().join("XboxGames");
        let user_root = temp.path().join("MoreGames");
        touch(&machine_root.join("Halo").join("Halo.exe"), 1024);
        touch(&user_root.join("Forza").join("Forza.exe"), 1024);

        let registry = MemoryRegistry::new()
            .with_value(
                Scope::Machine,
                &format!(r"{}\{{0001}}", MACHINE_ROOTS_KEY),
                MACHINE_ROOT_VALUE,
                &machine_root.to_string_lossy(),
            )
            .with_value(
                Scope::User,
                &format!(r"{}\D", USER_ROOTS_KEY),
                USER_ROOT_VALUE,
                &user_root.to_string_lossy(),
            )
            .with_value(
                Scope::User,
                &format!(r"{}\E", USER_ROOTS_KEY),
                USER_ROOT_VALUE,
                &temp.path().join("Unplugged").to_string_lossy(),
            );

        let ctx = ScanContext::new(Config::default(), Arc::new(registry));
        let games = DirectoryHeuristicScanner::registry_roots().scan(&ctx).await.unwrap();

        assert_eq!(sorted_names(&games), vec!["Forza", "Halo"]);
    }

    #[tokio::test]
    async fn test_cancelled_scan_returns_nothing() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Games");
        touch(&root.join("Hades").join("Hades.exe"), 1024);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = context_with_roots(vec![root]).with_cancel(cancel);

        let games = DirectoryHeuristicScanner::drive_roots().scan(&ctx).await.unwrap();
        assert!(games.is_empty());
    }
}
