//! Game scanners.
//!
//! This module provides the [`Scanner`] trait and one implementation per
//! discovery strategy.
//!
//! # Available Scanners
//!
//! | Scanner | Source | Platforms |
//! |---------|--------|-----------|
//! | [`SteamScanner`] | Steam library manifests | All |
//! | [`PackageRegistryScanner`] | Installed store packages (registry) | Windows |
//! | [`DirectoryHeuristicScanner::drive_roots`] | Game folders on drive roots and configured roots | All |
//! | [`DirectoryHeuristicScanner::registry_roots`] | Install roots declared in the registry | Windows |
//!
//! # Example
//!
//! ```no_run
//! use gamescan::registry::system_registry;
//! use gamescan::scanner::{all_scanners, ScanContext, Scanner};
//! use gamescan::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = ScanContext::new(Config::default(), system_registry());
//!     for scanner in all_scanners() {
//!         if scanner.is_supported() {
//!             println!("Scanning {}...", scanner.name());
//!             let games = scanner.scan(&ctx).await?;
//!             println!("Found {} games", games.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod heuristic;
mod packages;
mod steam;

pub use heuristic::{name_hint_from_dir, DirectoryHeuristicScanner};
pub use packages::{
    family_name_from_full_name, family_name_from_manifest, is_platform_game, publisher_id,
    PackageRegistryScanner,
};
pub use steam::{LibraryPathResolver, SteamScanner};

use crate::config::Config;
use crate::model::{GameCandidate, Platform, SourceKind};
use crate::registry::RegistryStore;
use crate::resolver::ExecutableResolver;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Everything a scanner needs for one scan invocation.
///
/// Cheap to clone; clones share the configuration, registry and
/// cancellation token.
#[derive(Clone)]
pub struct ScanContext {
    pub config: Arc<Config>,
    pub registry: Arc<dyn RegistryStore>,
    pub resolver: Arc<ExecutableResolver>,
    pub cancel: CancellationToken,
}

impl ScanContext {
    pub fn new(config: Config, registry: Arc<dyn RegistryStore>) -> Self {
        let resolver = Arc::new(config.executable_resolver());
        Self {
            config: Arc::new(config),
            registry,
            resolver,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Trait for discovering installed games through one strategy.
///
/// A scanner never fails because its source is absent: a machine without
/// Steam simply yields an empty list. Individual unreadable manifests or
/// directories are logged and skipped.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Returns the human-readable name of this scanner.
    fn name(&self) -> &'static str;

    /// Returns the kind of candidates this scanner primarily produces.
    fn source(&self) -> SourceKind;

    /// Returns the platforms this scanner supports.
    fn supported_platforms(&self) -> &[Platform];

    /// Returns true if this scanner is supported on the current platform.
    fn is_supported(&self) -> bool {
        let current = Platform::current();
        self.supported_platforms().contains(&current)
    }

    /// Scans for installed games.
    ///
    /// # Errors
    ///
    /// Only for failures of the strategy as a whole (e.g. a worker task
    /// panicked). The orchestrator treats such errors as "found nothing".
    async fn scan(&self, ctx: &ScanContext) -> Result<Vec<GameCandidate>>;
}

/// Returns every available scanner.
///
/// Use [`Scanner::is_supported`] to check whether one works on the current
/// platform.
///
/// # Example
///
/// ```
/// use gamescan::scanner::all_scanners;
///
/// let scanners = all_scanners();
/// assert_eq!(scanners.len(), 4);
/// ```
pub fn all_scanners() -> Vec<Box<dyn Scanner>> {
    vec![
        Box::new(SteamScanner),
        Box::new(PackageRegistryScanner),
        Box::new(DirectoryHeuristicScanner::drive_roots()),
        Box::new(DirectoryHeuristicScanner::registry_roots()),
    ]
}

/// Returns the scanners whose primary source is `source`.
///
/// # Example
///
/// ```
/// use gamescan::{scanner::scanners_for, SourceKind};
///
/// let scanners = scanners_for(SourceKind::DistributionClient);
/// assert_eq!(scanners[0].name(), "Steam Libraries");
/// ```
pub fn scanners_for(source: SourceKind) -> Vec<Box<dyn Scanner>> {
    all_scanners()
        .into_iter()
        .filter(|scanner| scanner.source() == source)
        .collect()
}
