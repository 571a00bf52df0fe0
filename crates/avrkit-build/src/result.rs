//! Terminal build outcome.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::classify::ProjectKind;
use crate::error::BuildError;
use crate::size::ImageSize;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStage {
    Prepare,
    Classify,
    Compile,
    Support,
    Link,
    Image,
    Size,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildStage::Prepare => "preparation",
            BuildStage::Classify => "classification",
            BuildStage::Compile => "compilation",
            BuildStage::Support => "core compilation",
            BuildStage::Link => "link",
            BuildStage::Image => "image extraction",
            BuildStage::Size => "size report",
        })
    }
}

/// A core source that failed to compile and was left out of the link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSource {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one build invocation. Produced once; never mutated by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    pub success: bool,
    pub board: String,
    pub kind: Option<ProjectKind>,
    /// Stage that failed, when `success` is false.
    pub failed_stage: Option<BuildStage>,
    pub error: Option<String>,
    /// Linked executable.
    pub elf: Option<PathBuf>,
    /// Flashable image.
    pub image: Option<PathBuf>,
    pub size: Option<ImageSize>,
    /// Recovered problems: defaulted descriptor values, compiler warnings,
    /// skipped core files.
    pub warnings: Vec<String>,
    pub skipped: Vec<SkippedSource>,
    pub stdout: String,
    pub stderr: String,
}

/// What the stages accumulate while running.
#[derive(Debug, Default)]
pub(crate) struct BuildLog {
    pub kind: Option<ProjectKind>,
    pub warnings: Vec<String>,
    pub skipped: Vec<SkippedSource>,
    pub stdout: String,
    pub stderr: String,
}

impl BuildLog {
    pub fn capture(&mut self, stdout: &str, stderr: &str) {
        append(&mut self.stdout, stdout);
        append(&mut self.stderr, stderr);
    }
}

fn append(buf: &mut String, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    buf.push_str(text);
    if !text.ends_with('\n') {
        buf.push('\n');
    }
}

/// Paths produced by a successful run.
#[derive(Debug)]
pub(crate) struct Artifacts {
    pub elf: PathBuf,
    pub image: PathBuf,
    pub size: Option<ImageSize>,
}

impl CompileResult {
    pub(crate) fn succeeded(board: &str, artifacts: Artifacts, log: BuildLog) -> Self {
        Self {
            success: true,
            board: board.to_string(),
            kind: log.kind,
            failed_stage: None,
            error: None,
            elf: Some(artifacts.elf),
            image: Some(artifacts.image),
            size: artifacts.size,
            warnings: log.warnings,
            skipped: log.skipped,
            stdout: log.stdout,
            stderr: log.stderr,
        }
    }

    pub(crate) fn failed(board: &str, err: &BuildError, log: BuildLog) -> Self {
        Self {
            success: false,
            board: board.to_string(),
            kind: log.kind,
            failed_stage: Some(err.stage()),
            error: Some(err.to_string()),
            elf: None,
            image: None,
            size: None,
            warnings: log.warnings,
            skipped: log.skipped,
            stdout: log.stdout,
            stderr: log.stderr,
        }
    }
}

impl fmt::Display for CompileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            writeln!(f, "build succeeded for board '{}'", self.board)?;
        } else {
            writeln!(f, "build FAILED for board '{}'", self.board)?;
        }
        if let Some(kind) = self.kind {
            writeln!(f, "  project: {kind}")?;
        }
        if let Some(ref elf) = self.elf {
            writeln!(f, "  executable: {}", elf.display())?;
        }
        if let Some(ref image) = self.image {
            writeln!(f, "  image: {}", image.display())?;
        }
        if let Some(size) = self.size {
            writeln!(f, "  flash: {} bytes, ram: {} bytes", size.flash_bytes, size.ram_bytes)?;
        }
        for skipped in &self.skipped {
            writeln!(f, "  skipped {}: {}", skipped.path.display(), skipped.reason)?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "  {} warning(s)", self.warnings.len())?;
        }
        if let (Some(stage), Some(error)) = (self.failed_stage, &self.error) {
            writeln!(f, "  {stage} error: {error}")?;
        }
        Ok(())
    }
}
