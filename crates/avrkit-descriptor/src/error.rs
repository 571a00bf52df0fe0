//! Error types for descriptor I/O.
//!
//! These never escape the public resolution functions; they are turned into
//! [`crate::Diagnostic`]s and default profiles at the crate boundary.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    /// Descriptor file does not exist.
    #[error("descriptor not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Descriptor file exists but could not be read.
    #[error("cannot read descriptor {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for descriptor I/O.
pub type Result<T> = std::result::Result<T, DescriptorError>;
