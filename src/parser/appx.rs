//! Platform package manifests (`AppxManifest.xml`).

use crate::error::ScanError;
use roxmltree::{Document, Node};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_NAMES: &[&str] = &["AppxManifest.xml", "appxmanifest.xml", "APPXMANIFEST.XML"];

/// Subdirectories that may hold the manifest of a game-container install,
/// e.g. `XboxGames\<Title>\Content\appxmanifest.xml`.
const MANIFEST_SUBDIRS: &[&str] = &["", "Content", "content"];

/// Identity, metadata and entry point of an installed package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest {
    pub identity_name: String,
    pub publisher: String,
    pub version: String,
    pub display_name: Option<String>,
    pub publisher_display_name: Option<String>,
    /// `Id` of the first declared application.
    pub application_id: Option<String>,
    /// `Executable` of the first declared application, relative to the package root.
    pub executable: Option<String>,
    pub is_framework: bool,
    pub is_resource_package: bool,
}

impl PackageManifest {
    /// True when the package declares a launchable application and is not
    /// a framework or resource package.
    pub fn is_interactive(&self) -> bool {
        self.application_id.is_some() && !self.is_framework && !self.is_resource_package
    }
}

/// Parses manifest XML. Elements are matched by local name, so any
/// namespace prefix is accepted.
pub fn parse_package_manifest(path: &Path, content: &str) -> Result<PackageManifest, ScanError> {
    let doc = Document::parse(content).map_err(|source| ScanError::Xml {
        path: path.to_path_buf(),
        source,
    })?;

    let identity = find_element(doc.root(), "Identity")
        .ok_or_else(|| ScanError::manifest(path, "missing Identity element"))?;
    let identity_name = identity
        .attribute("Name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ScanError::manifest(path, "Identity has no Name"))?
        .to_string();

    let mut manifest = PackageManifest {
        identity_name,
        publisher: identity.attribute("Publisher").unwrap_or_default().to_string(),
        version: identity.attribute("Version").unwrap_or_default().to_string(),
        ..Default::default()
    };

    if let Some(properties) = find_element(doc.root(), "Properties") {
        manifest.display_name = child_text(properties, "DisplayName").and_then(resolved_text);
        manifest.publisher_display_name =
            child_text(properties, "PublisherDisplayName").and_then(resolved_text);
        manifest.is_framework = child_text(properties, "Framework").is_some_and(is_true);
        manifest.is_resource_package = child_text(properties, "ResourcePackage").is_some_and(is_true);
    }

    if let Some(application) = find_element(doc.root(), "Application") {
        manifest.application_id = application
            .attribute("Id")
            .map(|id| id.to_string())
            .or_else(|| Some("App".to_string()));
        manifest.executable = application
            .attribute("Executable")
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| e.to_string());

        if manifest.display_name.is_none() {
            manifest.display_name = find_element(application, "VisualElements")
                .and_then(|v| v.attribute("DisplayName"))
                .and_then(resolved_text);
        }
    }

    Ok(manifest)
}

/// Reads and parses the manifest at `path`.
pub fn load_package_manifest(path: &Path) -> Result<PackageManifest, ScanError> {
    let content = fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
    parse_package_manifest(path, content.trim_start_matches('\u{feff}'))
}

/// Locates the manifest belonging to a package directory, looking in the
/// directory itself and in a `Content` subdirectory.
pub fn find_manifest(package_dir: &Path) -> Option<PathBuf> {
    MANIFEST_SUBDIRS
        .iter()
        .map(|sub| if sub.is_empty() { package_dir.to_path_buf() } else { package_dir.join(sub) })
        .flat_map(|dir| MANIFEST_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

fn find_element<'a, 'input>(node: Node<'a, 'input>, local_name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
}

fn child_text<'a>(node: Node<'a, '_>, local_name: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local_name)
        .and_then(|n| n.text())
}

/// Drops blank text and unresolved `ms-resource:` references.
fn resolved_text(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() || text.to_lowercase().starts_with("ms-resource:") {
        None
    } else {
        Some(text.to_string())
    }
}

fn is_true(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("true")
}
