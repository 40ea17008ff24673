//! Picks the game executable out of an install directory.
//!
//! Every executable below the root is scored and the best one wins:
//!
//! | Signal | Bonus |
//! |--------|-------|
//! | File stem equals the name hint | +100 |
//! | File stem contains the name hint | +50 |
//! | Role token (`launcher` > `game` > `main` > `start` > `play`) | +30 .. +5 |
//! | Size over 100 / 50 / 10 / 1 MB | +25 / +20 / +10 / +5 |
//! | File sits directly in the root | +15 |
//! | File sits in a `bin` directory | +10 |
//!
//! Stems and hints are compared lowercased with everything but letters and
//! digits removed. Files whose stem contains an exclusion token
//! (uninstallers, installers, redistributables, crash reporters, updaters)
//! are never returned.
//!
//! Ties on score go to the larger file, then to the lexicographically
//! smallest path (compared case-insensitively), so results do not depend on
//! directory enumeration order.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use walkdir::WalkDir;

/// Stem fragments that mark a file as something other than the game.
pub const DEFAULT_EXCLUDED_TOKENS: &[&str] = &[
    "unins",
    "uninstall",
    "setup",
    "install",
    "redist",
    "vcredist",
    "dxsetup",
    "directx",
    "dotnetfx",
    "prereq",
    "crashreport",
    "crashhandler",
    "crashpad",
    "bugreport",
    "update",
    "patcher",
];

const ROLE_TOKENS: &[(&str, i64)] = &[
    ("launcher", 30),
    ("game", 20),
    ("main", 15),
    ("start", 10),
    ("play", 5),
];

const MB: u64 = 1024 * 1024;

/// How far below the root to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveOptions {
    /// Directory levels below the root to descend into. `None` is unbounded;
    /// `Some(0)` only looks at files directly in the root.
    pub max_depth: Option<usize>,
}

impl ResolveOptions {
    /// Manifest-driven scans: the whole tree.
    pub fn unbounded() -> Self {
        Self { max_depth: None }
    }

    /// Manifest-less scans: the root plus `levels` nested directories.
    pub fn depth_limited(levels: usize) -> Self {
        Self {
            max_depth: Some(levels),
        }
    }
}

/// A scored executable. Only lives for the duration of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableCandidate {
    pub path: PathBuf,
    pub file_size_bytes: u64,
    pub score: i64,
}

#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    extensions: Vec<String>,
    excluded_tokens: Vec<String>,
}

impl Default for ExecutableResolver {
    fn default() -> Self {
        Self {
            extensions: vec!["exe".to_string()],
            excluded_tokens: DEFAULT_EXCLUDED_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl ExecutableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the set of file extensions treated as executables.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Adds exclusion tokens on top of [`DEFAULT_EXCLUDED_TOKENS`].
    pub fn with_extra_exclusions<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_tokens.extend(
            tokens
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .filter(|t| !t.is_empty()),
        );
        self
    }

    /// Returns the best executable under `root`, or `None` if nothing
    /// survives exclusion. `None` is an ordinary outcome: the game is still
    /// reported, just without a launch target.
    pub fn resolve(
        &self,
        root: &Path,
        name_hint: &str,
        options: ResolveOptions,
        cancel: &CancellationToken,
    ) -> Option<PathBuf> {
        let best = self.rank(root, name_hint, options, cancel).into_iter().next()?;
        debug!(
            root = %root.display(),
            hint = name_hint,
            exe = %best.path.display(),
            score = best.score,
            "resolved executable"
        );
        Some(best.path)
    }

    /// Scores every eligible executable under `root`, best first.
    pub fn rank(
        &self,
        root: &Path,
        name_hint: &str,
        options: ResolveOptions,
        cancel: &CancellationToken,
    ) -> Vec<ExecutableCandidate> {
        let hint = normalize(name_hint);

        let mut walker = WalkDir::new(root).sort_by_file_name();
        if let Some(levels) = options.max_depth {
            // Depth 1 is the root's own entries.
            walker = walker.max_depth(levels + 1);
        }

        let mut candidates: Vec<ExecutableCandidate> = walker
            .into_iter()
            .filter_entry(|_| !cancel.is_cancelled())
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.is_executable(entry.path()))
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                self.score(root, entry.path(), size, &hint)
                    .map(|score| ExecutableCandidate {
                        path: entry.into_path(),
                        file_size_bytes: size,
                        score,
                    })
            })
            .collect();

        candidates.sort_by(compare_candidates);
        candidates
    }

    fn is_executable(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Tokens match the stem as written or with separators removed, so
    /// `crash_handler` and `Crash-Reporter` hit `crashhandler`/`crashreport`.
    fn is_excluded(&self, stem: &str) -> bool {
        let normalized = normalize(stem);
        self.excluded_tokens.iter().any(|token| {
            stem.contains(token.as_str()) || {
                let token = normalize(token);
                !token.is_empty() && normalized.contains(&token)
            }
        })
    }

    /// Returns `None` for excluded files.
    fn score(&self, root: &Path, path: &Path, size: u64, hint: &str) -> Option<i64> {
        let stem = path.file_stem()?.to_string_lossy().to_lowercase();
        if self.is_excluded(&stem) {
            return None;
        }

        let normalized = normalize(&stem);
        let mut score = 0;

        if !hint.is_empty() {
            if normalized == hint {
                score += 100;
            } else if normalized.contains(hint) {
                score += 50;
            }
        }

        score += ROLE_TOKENS
            .iter()
            .filter(|(token, _)| stem.contains(token))
            .map(|(_, bonus)| *bonus)
            .max()
            .unwrap_or(0);

        score += size_bonus(size);

        if let Some(parent) = path.parent() {
            if parent == root {
                score += 15;
            } else if parent
                .file_name()
                .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case("bin"))
            {
                score += 10;
            }
        }

        Some(score)
    }
}

fn size_bonus(size: u64) -> i64 {
    if size > 100 * MB {
        25
    } else if size > 50 * MB {
        20
    } else if size > 10 * MB {
        10
    } else if size > MB {
        5
    } else {
        0
    }
}

fn compare_candidates(a: &ExecutableCandidate, b: &ExecutableCandidate) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.file_size_bytes.cmp(&a.file_size_bytes))
        .then_with(|| {
            let a_key = a.path.to_string_lossy().to_lowercase();
            let b_key = b.path.to_string_lossy().to_lowercase();
            a_key.cmp(&b_key)
        })
}

/// Lowercases and keeps only letters and digits.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
