//! Compiler/linker diagnostic classification.
//!
//! GCC-style tools report through stderr lines such as
//! `main.cpp:4:5: error: 'foo' was not declared in this scope`. Stages treat
//! any non-warning diagnostic as fatal, so the split matters more than the
//! exit code alone.

use serde::Serialize;

use crate::process::ToolOutput;

/// Severity of a single diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Diagnostics extracted from one tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilerDiagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl CompilerDiagnostics {
    /// Split stderr text into error and warning lines; everything else
    /// (notes, context lines, carets) is dropped.
    pub fn parse(stderr: &str) -> Self {
        let mut diagnostics = Self::default();
        for line in stderr.lines() {
            match classify_line(line) {
                Some(Severity::Error) => diagnostics.errors.push(line.trim().to_string()),
                Some(Severity::Warning) => diagnostics.warnings.push(line.trim().to_string()),
                None => {}
            }
        }
        diagnostics
    }

    /// Whether the tool run must abort its stage.
    pub fn is_fatal(&self, output: &ToolOutput) -> bool {
        !output.success || output.timed_out || !self.errors.is_empty()
    }

    /// First error line, or a generic description of the failed run.
    pub fn summary(&self, output: &ToolOutput) -> String {
        if let Some(first) = self.errors.first() {
            return first.clone();
        }
        if output.timed_out {
            return "tool timed out".to_string();
        }
        match output.exit_code {
            Some(code) => format!("tool exited with status {code}"),
            None => "tool terminated by signal".to_string(),
        }
    }
}

fn classify_line(line: &str) -> Option<Severity> {
    let lower = line.to_ascii_lowercase();
    if lower.contains("error:") || lower.contains("undefined reference to") {
        Some(Severity::Error)
    } else if lower.contains("warning:") {
        Some(Severity::Warning)
    } else {
        None
    }
}
