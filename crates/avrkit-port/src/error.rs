//! Port errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("cannot open serial port {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serial read from {} failed: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot enumerate serial ports: {0}")]
    Enumerate(#[source] std::io::Error),
}

/// Result type alias for port operations.
pub type Result<T> = std::result::Result<T, PortError>;
