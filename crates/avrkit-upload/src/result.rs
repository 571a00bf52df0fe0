//! Terminal upload outcome.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Category of an upload attempt or of the whole upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadOutcome {
    Success,
    /// The write completed but verification reported a mismatch.
    SuccessWithCaveat,
    /// The programmer never reached the bootloader.
    SyncFailure,
    PermissionDenied,
    Timeout,
    /// Writing started and did not complete.
    PartialWrite,
    PortAccess,
    ImageMissing,
    UnsupportedProtocol,
    ToolMissing,
    /// Failed with output that matched no known category.
    Failed,
}

impl UploadOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, UploadOutcome::Success | UploadOutcome::SuccessWithCaveat)
    }

    /// What the user can do about it.
    pub fn remediation(self) -> &'static str {
        match self {
            UploadOutcome::Success => "upload complete",
            UploadOutcome::SuccessWithCaveat => {
                "upload complete, but verification reported a mismatch; re-flash if the board misbehaves"
            }
            UploadOutcome::SyncFailure => {
                "could not reach the bootloader; check the board selection and cable, or press reset just before uploading"
            }
            UploadOutcome::PermissionDenied => {
                "permission denied on the serial port; add your user to the dialout (or uucp) group"
            }
            UploadOutcome::Timeout => {
                "the programmer timed out; close other programs using the port and retry"
            }
            UploadOutcome::PartialWrite => {
                "the write was interrupted part way; the board may not run until it is flashed again"
            }
            UploadOutcome::PortAccess => {
                "the serial port is missing or not accessible; reconnect the board"
            }
            UploadOutcome::ImageMissing => "no firmware image; build the project first",
            UploadOutcome::UnsupportedProtocol => "this board's upload protocol is not supported",
            UploadOutcome::ToolMissing => "install avrdude or put it on PATH",
            UploadOutcome::Failed => "upload failed; see the programmer output for details",
        }
    }
}

impl fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            UploadOutcome::Success => "success",
            UploadOutcome::SuccessWithCaveat => "success (caveat)",
            UploadOutcome::SyncFailure => "sync failure",
            UploadOutcome::PermissionDenied => "permission denied",
            UploadOutcome::Timeout => "timeout",
            UploadOutcome::PartialWrite => "partial write",
            UploadOutcome::PortAccess => "port access",
            UploadOutcome::ImageMissing => "missing image",
            UploadOutcome::UnsupportedProtocol => "unsupported protocol",
            UploadOutcome::ToolMissing => "missing programmer",
            UploadOutcome::Failed => "failed",
        })
    }
}

/// One invocation of the programmer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub baud: u32,
    pub outcome: UploadOutcome,
}

/// Outcome of one upload. Produced once; never mutated by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub outcome: UploadOutcome,
    pub image: PathBuf,
    pub port: PathBuf,
    pub protocol: Option<String>,
    /// Human-readable summary with remediation text.
    pub message: String,
    /// Set when the write completed but something after it did not.
    pub caveat: Option<String>,
    pub attempts: Vec<Attempt>,
    pub stdout: String,
    pub stderr: String,
}

impl UploadResult {
    pub(crate) fn new(image: PathBuf, port: PathBuf) -> Self {
        Self {
            success: false,
            outcome: UploadOutcome::Failed,
            image,
            port,
            protocol: None,
            message: String::new(),
            caveat: None,
            attempts: Vec::new(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub(crate) fn finish(mut self, outcome: UploadOutcome, detail: Option<String>) -> Self {
        self.success = outcome.is_success();
        self.outcome = outcome;
        self.message = match detail {
            Some(detail) => format!("{detail}: {}", outcome.remediation()),
            None => outcome.remediation().to_string(),
        };
        if outcome == UploadOutcome::SuccessWithCaveat {
            self.caveat = Some("verification failed after a completed write".to_string());
        }
        self
    }
}

impl fmt::Display for UploadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success {
            writeln!(f, "upload succeeded on {}", self.port.display())?;
        } else {
            writeln!(f, "upload FAILED on {}", self.port.display())?;
        }
        if let Some(ref protocol) = self.protocol {
            writeln!(f, "  protocol: {protocol}")?;
        }
        for attempt in &self.attempts {
            writeln!(f, "  attempt at {:>6} baud: {}", attempt.baud, attempt.outcome)?;
        }
        if let Some(ref caveat) = self.caveat {
            writeln!(f, "  caveat: {caveat}")?;
        }
        writeln!(f, "  {}", self.message)
    }
}
