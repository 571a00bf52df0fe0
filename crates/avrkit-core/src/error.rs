//! Errors raised while invoking external tools.

use thiserror::Error;

/// Errors that prevent an external tool from producing any output at all.
///
/// A tool that runs and fails is *not* an error at this level; its exit
/// status and output are returned in a [`crate::ToolOutput`] for the caller
/// to classify.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("required tool '{program}' was not found on PATH")]
    Missing { program: String },

    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for tool invocations.
pub type Result<T> = std::result::Result<T, ToolError>;
