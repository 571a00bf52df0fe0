//! Merge errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while applying generated code to a project.
///
/// Text merging itself is infallible; only file access can fail.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;
