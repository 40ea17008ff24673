use crate::config::Config;
use crate::model::{CandidateMetadata, GameCandidate, Platform, SourceKind};
use crate::parser::acf::{is_app_manifest_name, load_app_manifest, AppManifest};
use crate::parser::library_folders::parse_library_folders;
use crate::platform::{path_key, steam_fallback_dirs};
use crate::registry::{RegistryStore, Scope};
use crate::resolver::ResolveOptions;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::ScanContext;

const USER_STEAM_KEY: &str = r"Software\Valve\Steam";
const MACHINE_STEAM_KEYS: &[&str] = &[r"SOFTWARE\WOW6432Node\Valve\Steam", r"SOFTWARE\Valve\Steam"];

const LIBRARY_SUBDIR: &str = "steamapps";
const LIBRARY_INDEX: &str = "libraryfolders.vdf";
const COMMON_SUBDIR: &str = "common";

pub struct SteamScanner;

#[async_trait]
impl super::Scanner for SteamScanner {
    fn name(&self) -> &'static str {
        "Steam Libraries"
    }

    fn source(&self) -> SourceKind {
        SourceKind::DistributionClient
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Linux, Platform::MacOS, Platform::Windows]
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<GameCandidate>> {
        let locator = LibraryPathResolver::locate(ctx.registry.as_ref(), &ctx.config);
        let roots = tokio::task::spawn_blocking(move || locator.library_roots()).await?;

        if roots.is_empty() {
            debug!("no Steam libraries found");
            return Ok(Vec::new());
        }
        info!(libraries = roots.len(), "scanning Steam libraries");

        let mut tasks = Vec::new();
        for root in roots {
            if ctx.is_cancelled() {
                break;
            }
            let ctx = ctx.clone();
            tasks.push(tokio::task::spawn_blocking(move || scan_library(&root, &ctx)));
        }

        let mut games = Vec::new();
        for result in join_all(tasks).await {
            match result {
                Ok(found) => games.extend(found),
                Err(e) => warn!(error = %e, "Steam library worker failed"),
            }
        }

        Ok(games)
    }
}

/// Finds every Steam library root (`steamapps` directory) on the machine.
///
/// The client's own library comes first, followed by the libraries listed
/// in its `libraryfolders.vdf` and any configured extras. Only existing
/// directories are returned, deduplicated by [`path_key`].
#[derive(Debug, Clone, Default)]
pub struct LibraryPathResolver {
    client_dir: Option<PathBuf>,
    extra_roots: Vec<PathBuf>,
}

impl LibraryPathResolver {
    /// Locates the Steam client through the configuration override, the
    /// registry and finally the conventional install directories.
    pub fn locate(registry: &dyn RegistryStore, config: &Config) -> Self {
        let client_dir = config
            .steam_path
            .clone()
            .or_else(|| locate_client(registry, &steam_fallback_dirs()));

        Self {
            client_dir,
            extra_roots: config.extra_library_roots.clone(),
        }
    }

    pub fn with_client_dir(client_dir: impl Into<PathBuf>) -> Self {
        Self {
            client_dir: Some(client_dir.into()),
            extra_roots: Vec::new(),
        }
    }

    pub fn with_extra_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.extra_roots = roots;
        self
    }

    pub fn client_dir(&self) -> Option<&Path> {
        self.client_dir.as_deref()
    }

    pub fn library_roots(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(client_dir) = self.client_dir.as_ref().filter(|d| d.is_dir()) {
            let default_library = client_dir.join(LIBRARY_SUBDIR);
            candidates.push(default_library.clone());

            let index = default_library.join(LIBRARY_INDEX);
            match fs::read(&index) {
                Ok(bytes) => {
                    let content = String::from_utf8_lossy(&bytes);
                    candidates.extend(
                        parse_library_folders(&content)
                            .into_iter()
                            .map(|library| library.join(LIBRARY_SUBDIR)),
                    );
                }
                Err(e) => debug!(path = %index.display(), error = %e, "no library index"),
            }
        } else {
            debug!("Steam client directory not found");
        }

        candidates.extend(self.extra_roots.iter().cloned());

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|root| root.is_dir())
            .filter(|root| seen.insert(path_key(root)))
            .collect()
    }
}

/// Returns the Steam install directory recorded in the registry, or the
/// first existing fallback directory.
fn locate_client(registry: &dyn RegistryStore, fallbacks: &[PathBuf]) -> Option<PathBuf> {
    let from_registry = registry
        .get_value(Scope::User, USER_STEAM_KEY, "SteamPath")
        .into_iter()
        .chain(
            MACHINE_STEAM_KEYS
                .iter()
                .filter_map(|key| registry.get_value(Scope::Machine, key, "InstallPath")),
        )
        .map(PathBuf::from)
        .find(|dir| dir.is_dir());

    from_registry.or_else(|| fallbacks.iter().find(|dir| dir.is_dir()).cloned())
}

/// Reads every installed app manifest in one library root.
fn scan_library(root: &Path, ctx: &ScanContext) -> Vec<GameCandidate> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %root.display(), error = %e, "failed to read Steam library");
            return Vec::new();
        }
    };

    let mut manifests: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| is_app_manifest_name(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.path())
        .collect();
    manifests.sort();

    let mut games = Vec::new();
    for manifest_path in manifests {
        if ctx.is_cancelled() {
            break;
        }

        let app = match load_app_manifest(&manifest_path) {
            Ok(Some(app)) => app,
            Ok(None) => {
                debug!(path = %manifest_path.display(), "app not fully installed");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "skipping app manifest");
                continue;
            }
        };

        if let Some(game) = candidate_from_app(root, &app, ctx) {
            games.push(game);
        }
    }

    games
}

fn candidate_from_app(library_root: &Path, app: &AppManifest, ctx: &ScanContext) -> Option<GameCandidate> {
    let install_root = library_root.join(COMMON_SUBDIR).join(&app.install_dir);
    if !install_root.is_dir() {
        debug!(app_id = app.app_id, path = %install_root.display(), "install directory missing, manifest is stale");
        return None;
    }

    let executable = ctx
        .resolver
        .resolve(&install_root, &app.name, ResolveOptions::unbounded(), &ctx.cancel);

    let metadata = CandidateMetadata {
        publisher: None,
        version: app.build_id.clone(),
    };

    Some(
        GameCandidate::new(SourceKind::DistributionClient, &app.name, install_root)
            .with_identity(app.app_id.to_string())
            .with_executable(executable)
            .with_metadata(metadata),
    )
}
