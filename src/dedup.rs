//! Merges candidates reported by several scan strategies.
//!
//! The same installation can be seen twice, e.g. once through a Steam
//! manifest (with an app id) and once by the folder heuristic (without
//! one). An incoming candidate is dropped when:
//!
//! 1. its identity key is non-empty and an accepted candidate of the same
//!    source kind has the same key, or
//! 2. its executable path is set and an accepted candidate has the same
//!    executable (compared via [`path_key`]), whatever the source, or
//! 3. it has no identity key and an accepted candidate has the same
//!    install root.
//!
//! [`merge`] offers identity-keyed candidates first, so when a keyed and a
//! keyless candidate describe the same game the keyed one survives.

use crate::model::{GameCandidate, SourceKind};
use crate::platform::path_key;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Deduplicator {
    identities: HashSet<(SourceKind, String)>,
    executables: HashSet<String>,
    roots: HashSet<String>,
    accepted: Vec<GameCandidate>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers games that are already known, e.g. a user's curated
    /// library, without including them in [`into_games`](Self::into_games).
    /// Later offers are checked against them with the same rules.
    pub fn seed<'a>(&mut self, existing: impl IntoIterator<Item = &'a GameCandidate>) {
        for game in existing {
            self.register(game);
        }
    }

    /// True if `candidate` matches something already accepted or seeded.
    pub fn is_duplicate(&self, candidate: &GameCandidate) -> bool {
        if candidate.has_identity()
            && self
                .identities
                .contains(&(candidate.source, candidate.identity_key.to_lowercase()))
        {
            return true;
        }

        if let Some(exe) = &candidate.executable_path {
            if self.executables.contains(&path_key(exe)) {
                return true;
            }
        }

        !candidate.has_identity() && self.roots.contains(&path_key(&candidate.install_root))
    }

    /// Accepts `candidate` unless it is a duplicate. Returns whether it was accepted.
    pub fn offer(&mut self, candidate: GameCandidate) -> bool {
        if self.is_duplicate(&candidate) {
            return false;
        }
        self.register(&candidate);
        self.accepted.push(candidate);
        true
    }

    fn register(&mut self, game: &GameCandidate) {
        if game.has_identity() {
            self.identities
                .insert((game.source, game.identity_key.to_lowercase()));
        }
        if let Some(exe) = &game.executable_path {
            self.executables.insert(path_key(exe));
        }
        self.roots.insert(path_key(&game.install_root));
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn into_games(self) -> Vec<GameCandidate> {
        self.accepted
    }
}

/// Merges the candidate lists of all strategies into one duplicate-free list.
///
/// # Example
///
/// ```
/// use gamescan::{dedup::merge, GameCandidate, SourceKind};
///
/// let from_steam = GameCandidate::new(SourceKind::DistributionClient, "Team Fortress 2", r"C:\Games\TF2")
///     .with_identity("440")
///     .with_executable(Some(r"C:\Games\TF2\hl2.exe".into()));
/// let from_folders = GameCandidate::new(SourceKind::DirectoryHeuristic, "TF2", r"c:\games\tf2")
///     .with_executable(Some(r"c:\games\tf2\HL2.EXE".into()));
///
/// let merged = merge(vec![vec![from_folders], vec![from_steam]]);
/// assert_eq!(merged.len(), 1);
/// assert_eq!(merged[0].identity_key, "440");
/// ```
pub fn merge(lists: Vec<Vec<GameCandidate>>) -> Vec<GameCandidate> {
    let (keyed, keyless): (Vec<_>, Vec<_>) = lists
        .into_iter()
        .flatten()
        .partition(GameCandidate::has_identity);

    let mut dedup = Deduplicator::new();
    for candidate in keyed.into_iter().chain(keyless) {
        dedup.offer(candidate);
    }
    dedup.into_games()
}
