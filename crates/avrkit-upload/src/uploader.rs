//! Upload orchestration.

use std::path::Path;
use std::time::Duration;

use avrkit_descriptor::BoardProfile;
use avrkit_port::{LeasePurpose, PortCoordinator};

use crate::classify::{classify_output, OutputPatterns, AVRDUDE_PATTERNS};
use crate::error::{Result, UploadError};
use crate::ladder::BaudLadder;
use crate::programmer::{FlashRequest, Programmer};
use crate::protocol::ProtocolFamily;
use crate::result::{Attempt, UploadOutcome, UploadResult};

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Bound on each programmer run; exceeding it is a timeout failure.
    pub attempt_timeout: Duration,
    pub patterns: OutputPatterns,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(60),
            patterns: AVRDUDE_PATTERNS,
        }
    }
}

/// Flashes images through a [`Programmer`], holding a flash lease on the
/// port for the duration.
pub struct Uploader<P: Programmer> {
    programmer: P,
    coordinator: PortCoordinator,
    options: UploadOptions,
}

impl<P: Programmer> Uploader<P> {
    pub fn new(programmer: P, coordinator: PortCoordinator, options: UploadOptions) -> Self {
        Self {
            programmer,
            coordinator,
            options,
        }
    }

    pub fn programmer(&self) -> &P {
        &self.programmer
    }

    /// Write `image` to the board on `port`.
    ///
    /// Never fails: precondition failures are reported before any device
    /// I/O, and everything after is classified into the returned result.
    pub async fn upload(&self, image: &Path, port: &Path, board: &BoardProfile) -> UploadResult {
        let mut result = UploadResult::new(image.to_path_buf(), port.to_path_buf());
        let family = match preflight(image, port, board).await {
            Ok(family) => family,
            Err(e) => {
                tracing::error!(port = %port.display(), "upload not started: {e}");
                return result.finish(e.outcome(), Some(e.to_string()));
            }
        };
        result.protocol = Some(family.to_string());

        let lease = self
            .coordinator
            .request_lease(port, LeasePurpose::Flash)
            .await;
        let outcome = self.attempts(family, image, port, board, &mut result).await;
        lease.release();

        match outcome {
            Ok(outcome) => {
                if outcome.is_success() {
                    tracing::info!(port = %port.display(), %outcome, "upload finished");
                } else {
                    tracing::error!(port = %port.display(), %outcome, "upload failed");
                }
                result.finish(outcome, None)
            }
            Err(e) => {
                tracing::error!(port = %port.display(), "upload failed: {e}");
                result.finish(e.outcome(), Some(e.to_string()))
            }
        }
    }

    async fn attempts(
        &self,
        family: ProtocolFamily,
        image: &Path,
        port: &Path,
        board: &BoardProfile,
        result: &mut UploadResult,
    ) -> Result<UploadOutcome> {
        if family.needs_reset_touch() {
            if let Err(e) = self.programmer.reset_touch(port).await {
                tracing::warn!(port = %port.display(), "1200-baud reset touch failed: {e}");
            }
        }

        let mut ladder = BaudLadder::new(family, Some(board.upload.speed));
        let mut last = None;
        while let Some(baud) = ladder.advance(last) {
            let request = FlashRequest {
                image: image.to_path_buf(),
                port: port.to_path_buf(),
                mcu: board.mcu.clone(),
                family,
                baud,
                timeout: self.options.attempt_timeout,
            };
            tracing::info!(port = %port.display(), %family, baud, "flashing");
            let output = self.programmer.flash(&request).await.map_err(UploadError::from)?;
            append(&mut result.stdout, &output.stdout);
            append(&mut result.stderr, &output.stderr);

            let outcome = classify_output(&output, &self.options.patterns);
            if outcome == UploadOutcome::SyncFailure {
                tracing::warn!(baud, "bootloader did not answer");
            }
            result.attempts.push(Attempt { baud, outcome });
            last = Some(outcome);
        }
        Ok(last.unwrap_or(UploadOutcome::Failed))
    }
}

/// Checks made before any device I/O. All failures are fatal.
async fn preflight(image: &Path, port: &Path, board: &BoardProfile) -> Result<ProtocolFamily> {
    match tokio::fs::metadata(image).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => {
            return Err(UploadError::ImageMissing {
                path: image.to_path_buf(),
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(UploadError::ImageMissing {
                path: image.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(UploadError::Inspect {
                path: image.to_path_buf(),
                source,
            })
        }
    }

    let meta = tokio::fs::metadata(port).await.map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            UploadError::PortMissing {
                path: port.to_path_buf(),
            }
        } else {
            UploadError::Inspect {
                path: port.to_path_buf(),
                source,
            }
        }
    })?;
    if meta.permissions().readonly() {
        return Err(UploadError::PortNotWritable {
            path: port.to_path_buf(),
        });
    }
    check_access(port).map_err(|source| UploadError::PortDenied {
        path: port.to_path_buf(),
        source,
    })?;

    ProtocolFamily::from_protocol(&board.upload.protocol)
}

/// Read/write access for the calling user, checked without opening the
/// device (opening it resets the board).
#[cfg(unix)]
fn check_access(port: &Path) -> std::io::Result<()> {
    use nix::unistd::{access, AccessFlags};
    access(port, AccessFlags::R_OK | AccessFlags::W_OK).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn check_access(_port: &Path) -> std::io::Result<()> {
    Ok(())
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
