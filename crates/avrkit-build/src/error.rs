//! Build errors.

use std::path::PathBuf;

use avrkit_core::ToolError;
use thiserror::Error;

use crate::result::BuildStage;

/// Fatal failures of a build stage.
///
/// These never escape [`crate::Builder::build`]; they are converted into a
/// failed [`crate::CompileResult`] at the boundary.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("no entry file found (looked for {})", candidates.join(", "))]
    NoEntry { candidates: Vec<String> },

    #[error(
        "cannot classify {}: no Arduino.h, <avr/...> include or setup()/loop() definitions",
        path.display()
    )]
    Unclassified { path: PathBuf },

    #[error("framework build needs a hardware root containing cores/arduino")]
    NoHardwareRoot,

    #[error("framework core directory {} does not exist", path.display())]
    CoreNotFound { path: PathBuf },

    #[error("{stage} failed on {}: {message}", file.display())]
    Compile {
        stage: BuildStage,
        file: PathBuf,
        message: String,
    },

    #[error("compiler reported success but produced no object file {}", path.display())]
    MissingObject { path: PathBuf },

    #[error("link failed: {message}")]
    Link { message: String },

    #[error("image extraction failed: {message}")]
    Image { message: String },

    #[error("{stage} stage needs '{tool}', which is not installed or not on PATH")]
    ToolMissing { stage: BuildStage, tool: String },

    #[error("{stage} stage could not run its tool: {source}")]
    Tool {
        stage: BuildStage,
        #[source]
        source: ToolError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Attribute a tool invocation failure to a stage.
    pub fn tool(stage: BuildStage, err: ToolError) -> Self {
        match err {
            ToolError::Missing { program } => BuildError::ToolMissing {
                stage,
                tool: program,
            },
            source => BuildError::Tool { stage, source },
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stage the failure belongs to.
    pub fn stage(&self) -> BuildStage {
        match self {
            BuildError::NoEntry { .. } | BuildError::Unclassified { .. } => BuildStage::Classify,
            BuildError::NoHardwareRoot | BuildError::CoreNotFound { .. } => BuildStage::Support,
            BuildError::MissingObject { .. } => BuildStage::Compile,
            BuildError::Compile { stage, .. }
            | BuildError::ToolMissing { stage, .. }
            | BuildError::Tool { stage, .. } => *stage,
            BuildError::Link { .. } => BuildStage::Link,
            BuildError::Image { .. } => BuildStage::Image,
            BuildError::Io { .. } => BuildStage::Prepare,
        }
    }
}

/// Result type alias for build stages.
pub type Result<T> = std::result::Result<T, BuildError>;
