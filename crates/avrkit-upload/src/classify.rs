//! Classification of programmer output.
//!
//! The programmer's exit status does not distinguish failure causes, so the
//! category comes from its text output. The substrings live in one versioned
//! table; when the programmer's wording changes, add a new table rather than
//! editing matching code.

use avrkit_core::ToolOutput;

use crate::result::UploadOutcome;

/// Substrings (lowercase) recognised in programmer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputPatterns {
    /// Identifies the tool output format the table was written against.
    pub version: &'static str,
    pub sync: &'static [&'static str],
    pub permission: &'static [&'static str],
    pub timeout: &'static [&'static str],
    /// All must be present for a write to count as completed.
    pub write_complete: &'static [&'static str],
    /// Any present after a completed write turns success into a caveat.
    pub verify_mismatch: &'static [&'static str],
    /// Signs that flash writing had started. Progress bars alone do not
    /// count: the signature read prints one before any write.
    pub write_started: &'static [&'static str],
}

/// avrdude 6.x and 7.x.
pub const AVRDUDE_PATTERNS: OutputPatterns = OutputPatterns {
    version: "avrdude-6/7",
    sync: &[
        "stk500_getsync",
        "not in sync",
        "stk500_recv",
        "programmer is not responding",
        "butterfly_recv",
    ],
    permission: &["permission denied", "access is denied", "access denied"],
    timeout: &["timed out", "timeout"],
    write_complete: &["100%", "bytes of flash written"],
    verify_mismatch: &["verification error", "content mismatch", "mismatch at"],
    write_started: &["writing flash", "writing |"],
};

fn any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn all(text: &str, needles: &[&str]) -> bool {
    !needles.is_empty() && needles.iter().all(|n| text.contains(n))
}

/// Category of one programmer run.
///
/// A completed write is a success even if verification failed afterwards;
/// that case is reported as [`UploadOutcome::SuccessWithCaveat`]. A write
/// that started and then broke off is a partial write whatever the cause,
/// so it is never mistaken for a bootloader that did not answer.
pub fn classify_output(output: &ToolOutput, patterns: &OutputPatterns) -> UploadOutcome {
    if output.timed_out {
        return UploadOutcome::Timeout;
    }
    let text = output.combined().to_lowercase();

    if all(&text, patterns.write_complete) {
        return if any(&text, patterns.verify_mismatch) {
            UploadOutcome::SuccessWithCaveat
        } else {
            UploadOutcome::Success
        };
    }
    if any(&text, patterns.permission) {
        return UploadOutcome::PermissionDenied;
    }
    if any(&text, patterns.write_started) {
        return UploadOutcome::PartialWrite;
    }
    if any(&text, patterns.sync) {
        return UploadOutcome::SyncFailure;
    }
    if any(&text, patterns.timeout) {
        return UploadOutcome::Timeout;
    }
    if output.success {
        UploadOutcome::Success
    } else {
        UploadOutcome::Failed
    }
}
