//! Synthesis errors.

use thiserror::Error;

/// A problem found while validating a peripheral configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Index of the offending peripheral in declaration order.
    pub peripheral: usize,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "peripheral #{}: {}", self.peripheral, self.message)
    }
}

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("invalid peripheral configuration ({} issue(s)): {}", issues.len(), render(issues))]
    Invalid { issues: Vec<ValidationIssue> },
}

fn render(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for synthesis.
pub type Result<T> = std::result::Result<T, SynthError>;
