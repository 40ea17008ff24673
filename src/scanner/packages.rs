use crate::model::{dir_name, CandidateMetadata, GameCandidate, Platform, SourceKind};
use crate::parser::appx::{find_manifest, load_package_manifest, PackageManifest};
use crate::resolver::ResolveOptions;
use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::ScanContext;
use crate::registry::Scope;

/// Per-user package repository: one subkey per installed package full name.
pub const PACKAGES_KEY: &str =
    r"Software\Classes\Local Settings\Software\Microsoft\Windows\CurrentVersion\AppModel\Repository\Packages";

const ROOT_VALUE: &str = "PackageRootFolder";
const DISPLAY_NAME_VALUE: &str = "DisplayName";

/// Identity names and publisher names of first-party game packages.
const PLATFORM_GAME_PREFIXES: &[&str] = &[
    "Microsoft.Minecraft",
    "Microsoft.MicrosoftSolitaireCollection",
    "Microsoft.MicrosoftMahjong",
    "Microsoft.MicrosoftMinesweeper",
    "Microsoft.MicrosoftJigsaw",
    "Microsoft.Halo",
    "Microsoft.Forza",
    "Microsoft.SeaofThieves",
    "Mojang",
    "Xbox Game Studios",
];

const DEFAULT_APP_ID: &str = "App";

/// Alphabet of the publisher id: Crockford base32, lowercase.
const PUBLISHER_ID_ALPHABET: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

pub struct PackageRegistryScanner;

#[async_trait]
impl super::Scanner for PackageRegistryScanner {
    fn name(&self) -> &'static str {
        "Store Packages"
    }

    fn source(&self) -> SourceKind {
        SourceKind::PlatformPackage
    }

    fn supported_platforms(&self) -> &[Platform] {
        &[Platform::Windows]
    }

    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<GameCandidate>> {
        let ctx = ctx.clone();
        let games = tokio::task::spawn_blocking(move || enumerate_packages(&ctx)).await?;
        Ok(games)
    }
}

fn enumerate_packages(ctx: &ScanContext) -> Vec<GameCandidate> {
    let packages = ctx.registry.list_subkeys(Scope::User, PACKAGES_KEY);
    if packages.is_empty() {
        debug!("package repository is empty or unreadable");
        return Vec::new();
    }
    info!(packages = packages.len(), "enumerating installed packages");

    let containers = container_names(&ctx.config.container_folders);
    let mut games = Vec::new();

    for full_name in packages {
        if ctx.is_cancelled() {
            break;
        }

        let key = format!(r"{}\{}", PACKAGES_KEY, full_name);
        let Some(root) = ctx.registry.get_value(Scope::User, &key, ROOT_VALUE) else {
            continue;
        };
        let root = PathBuf::from(root);
        if !root.is_dir() {
            debug!(package = %full_name, path = %root.display(), "package root missing");
            continue;
        }

        let Some(manifest_path) = find_manifest(&root) else {
            continue;
        };
        let mut manifest = match load_package_manifest(&manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(package = %full_name, error = %e, "skipping package");
                continue;
            }
        };
        if manifest.display_name.is_none() {
            manifest.display_name = ctx
                .registry
                .get_value(Scope::User, &key, DISPLAY_NAME_VALUE)
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty() && !name.to_lowercase().starts_with("ms-resource:"));
        }

        if !manifest.is_interactive() || !is_platform_game(&root, &manifest, &containers) {
            continue;
        }

        let package_root = manifest_path.parent().unwrap_or(&root);
        let family = family_name_from_full_name(&full_name);
        games.push(candidate_from_manifest(package_root, &manifest, family.as_deref(), ctx));
    }

    games
}

/// Last path component of each configured container folder, e.g.
/// `Program Files\ModifiableWindowsApps` becomes `ModifiableWindowsApps`.
pub(crate) fn container_names(folders: &[String]) -> Vec<String> {
    folders
        .iter()
        .filter_map(|folder| folder.rsplit(['\\', '/']).find(|part| !part.is_empty()))
        .map(|name| name.to_lowercase())
        .collect()
}

/// Decides whether an interactive package is a game.
///
/// Either its root lies inside a games container folder, or its identity
/// or publisher starts with one of a short list of first-party prefixes.
/// Anything else is assumed not to be a game.
pub fn is_platform_game(root: &Path, manifest: &PackageManifest, container_names: &[String]) -> bool {
    let in_container = root.components().any(|component| {
        let part = component.as_os_str().to_string_lossy().to_lowercase();
        container_names.iter().any(|name| *name == part)
    }) || {
        // Windows paths seen on other hosts are a single component.
        let lowered = root.to_string_lossy().to_lowercase().replace('\\', "/");
        container_names
            .iter()
            .any(|name| lowered.split('/').any(|part| part == name))
    };

    if in_container {
        return true;
    }

    let matches_prefix = |value: &str| {
        let value = value.to_lowercase();
        PLATFORM_GAME_PREFIXES
            .iter()
            .any(|prefix| value.starts_with(&prefix.to_lowercase()))
    };

    matches_prefix(&manifest.identity_name)
        || manifest.publisher_display_name.as_deref().is_some_and(matches_prefix)
}

/// Converts a package full name (`Name_Version_Arch_ResourceId_PublisherId`)
/// into its family name (`Name_PublisherId`).
///
/// # Example
///
/// ```
/// use gamescan::scanner::family_name_from_full_name;
///
/// assert_eq!(
///     family_name_from_full_name("Microsoft.MinecraftUWP_1.20.5101.0_x64__8wekyb3d8bbwe").as_deref(),
///     Some("Microsoft.MinecraftUWP_8wekyb3d8bbwe")
/// );
/// assert_eq!(family_name_from_full_name("Halo Infinite"), None);
/// ```
pub fn family_name_from_full_name(full_name: &str) -> Option<String> {
    let parts: Vec<&str> = full_name.split('_').collect();
    if parts.len() != 5 || parts[0].is_empty() || parts[4].is_empty() {
        return None;
    }
    Some(format!("{}_{}", parts[0], parts[4]))
}

/// Computes the 13-character publisher id for a manifest `Publisher` string.
///
/// The first 8 bytes of the SHA-256 of the UTF-16LE publisher, padded with
/// one zero bit to 65 bits, are written as 13 base32 digits.
///
/// # Example
///
/// ```
/// use gamescan::scanner::publisher_id;
///
/// assert_eq!(
///     publisher_id("CN=Microsoft Corporation, O=Microsoft Corporation, L=Redmond, S=Washington, C=US"),
///     "8wekyb3d8bbwe"
/// );
/// ```
pub fn publisher_id(publisher: &str) -> String {
    let utf16: Vec<u8> = publisher.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let digest = Sha256::digest(&utf16);

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let bits = u128::from(u64::from_be_bytes(head)) << 1;

    (0..13)
        .rev()
        .map(|group| PUBLISHER_ID_ALPHABET[((bits >> (group * 5)) & 0x1f) as usize] as char)
        .collect()
}

/// Family name (`Name_PublisherId`) derived from the manifest identity.
pub fn family_name_from_manifest(manifest: &PackageManifest) -> Option<String> {
    if manifest.identity_name.is_empty() || manifest.publisher.is_empty() {
        return None;
    }
    Some(format!("{}_{}", manifest.identity_name, publisher_id(&manifest.publisher)))
}

/// Builds a candidate from a parsed manifest.
///
/// The identity key is the package family name. `family_name` comes from
/// the registry full name when there is one; otherwise it is derived from
/// the manifest publisher, so both discovery paths agree. Without a family
/// the identity name is used and no launch hint is set.
///
/// A declared executable that does not exist is replaced by the best
/// executable found under `package_root`.
pub(crate) fn candidate_from_manifest(
    package_root: &Path,
    manifest: &PackageManifest,
    family_name: Option<&str>,
    ctx: &ScanContext,
) -> GameCandidate {
    let display_name = manifest
        .display_name
        .clone()
        .unwrap_or_else(|| synthesize_name(package_root));

    let declared = manifest
        .executable
        .as_deref()
        .map(|exe| join_relative(package_root, exe))
        .filter(|path| path.is_file());

    let executable = declared.or_else(|| {
        debug!(
            package = %manifest.identity_name,
            "declared executable missing, searching package root"
        );
        ctx.resolver
            .resolve(package_root, &display_name, ResolveOptions::unbounded(), &ctx.cancel)
    });

    let metadata = CandidateMetadata {
        publisher: manifest
            .publisher_display_name
            .clone()
            .or_else(|| Some(manifest.publisher.clone()).filter(|p| !p.is_empty())),
        version: Some(manifest.version.clone()).filter(|v| !v.is_empty()),
    };

    let family = family_name
        .map(str::to_string)
        .or_else(|| family_name_from_manifest(manifest));

    let mut game = GameCandidate::new(SourceKind::PlatformPackage, display_name, package_root)
        .with_identity(family.as_deref().unwrap_or(manifest.identity_name.as_str()))
        .with_executable(executable)
        .with_metadata(metadata);

    if let Some(family) = family {
        let app_id = manifest.application_id.as_deref().unwrap_or(DEFAULT_APP_ID);
        game = game.with_launch_hint(format!(r"shell:AppsFolder\{}!{}", family, app_id));
    }

    game
}

/// Joins a manifest-relative path that may use either separator.
fn join_relative(root: &Path, relative: &str) -> PathBuf {
    relative
        .split(['\\', '/'])
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Derives a readable name from a package directory when the manifest has none.
///
/// `Content` directories use their parent's name, full package names are
/// cut to the identity, and dotted identities keep their last segment.
fn synthesize_name(package_root: &Path) -> String {
    let dir = if dir_name(package_root).eq_ignore_ascii_case("content") {
        package_root.parent().unwrap_or(package_root)
    } else {
        package_root
    };

    let name = dir_name(dir);
    let identity = name.split('_').next().unwrap_or(&name);
    identity
        .rsplit('.')
        .find(|part| !part.is_empty())
        .unwrap_or(identity)
        .to_string()
}
