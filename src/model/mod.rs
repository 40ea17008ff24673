//! Core data types for discovered games and scan results.
//!
//! This module contains the fundamental types used throughout gamescan:
//!
//! - [`GameCandidate`] - A game found by one scan strategy
//! - [`SourceKind`] - Which kind of strategy produced a candidate
//! - [`Platform`] - Operating system platform
//! - [`ScanResult`] - Merged results of a full scan
//!
//! # Example
//!
//! ```
//! use gamescan::{GameCandidate, ScanResult, SourceKind};
//!
//! let game = GameCandidate::new(SourceKind::DistributionClient, "Portal 2", "/games/Portal 2")
//!     .with_identity("620");
//! let result = ScanResult::new(vec![game]);
//!
//! println!("Found {} games", result.games.len());
//! ```

mod candidate;

pub use candidate::*;
