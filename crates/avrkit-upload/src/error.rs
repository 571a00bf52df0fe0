//! Upload errors.

use std::path::PathBuf;

use avrkit_core::ToolError;
use thiserror::Error;

use crate::result::UploadOutcome;

/// Failures that end an upload before or outside of output classification.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("image {} does not exist", path.display())]
    ImageMissing { path: PathBuf },

    #[error("serial port {} does not exist", path.display())]
    PortMissing { path: PathBuf },

    #[error("serial port {} is not writable", path.display())]
    PortNotWritable { path: PathBuf },

    #[error("serial port {} is not readable and writable by this user: {source}", path.display())]
    PortDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot inspect {}: {source}", path.display())]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported upload protocol '{protocol}' (expected arduino or avr109)")]
    UnsupportedProtocol { protocol: String },

    #[error("programmer '{tool}' is not installed or not on PATH")]
    ToolMissing { tool: String },

    #[error("programmer could not run: {0}")]
    Tool(#[source] ToolError),
}

impl From<ToolError> for UploadError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Missing { program } => UploadError::ToolMissing { tool: program },
            other => UploadError::Tool(other),
        }
    }
}

impl UploadError {
    pub fn outcome(&self) -> UploadOutcome {
        match self {
            UploadError::ImageMissing { .. } => UploadOutcome::ImageMissing,
            UploadError::PortMissing { .. }
            | UploadError::PortNotWritable { .. }
            | UploadError::PortDenied { .. }
            | UploadError::Inspect { .. } => UploadOutcome::PortAccess,
            UploadError::UnsupportedProtocol { .. } => UploadOutcome::UnsupportedProtocol,
            UploadError::ToolMissing { .. } => UploadOutcome::ToolMissing,
            UploadError::Tool(_) => UploadOutcome::Failed,
        }
    }
}

/// Result type alias for upload operations.
pub type Result<T> = std::result::Result<T, UploadError>;
