//! Error types for per-item scan failures.
//!
//! None of these abort a scan. Strategies log them and move on to the
//! next manifest, package or directory.

use std::path::PathBuf;

/// Errors produced while reading a single manifest or directory.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("invalid XML in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ScanError::Manifest {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
