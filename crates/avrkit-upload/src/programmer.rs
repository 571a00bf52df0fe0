//! Device programmer seam.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use avrkit_core::{Invocation, ToolError, ToolOutput, ToolRunner};
use avrkit_port::{Connector, SystemConnector};

use crate::protocol::ProtocolFamily;

/// Parameters of a single flash attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRequest {
    pub image: PathBuf,
    pub port: PathBuf,
    pub mcu: String,
    pub family: ProtocolFamily,
    pub baud: u32,
    /// Wall-clock bound for this attempt.
    pub timeout: Duration,
}

/// Writes an image through a bootloader. Each call is one all-or-nothing
/// attempt.
#[async_trait]
pub trait Programmer: Send + Sync {
    async fn flash(&self, request: &FlashRequest) -> Result<ToolOutput, ToolError>;

    /// Put the board into its bootloader by touching the port at 1200 baud.
    async fn reset_touch(&self, port: &Path) -> std::io::Result<()>;
}

/// Wait after a reset touch for the bootloader to enumerate.
pub const TOUCH_SETTLE: Duration = Duration::from_secs(2);

/// Runs `avrdude` through a [`ToolRunner`].
#[derive(Debug, Clone)]
pub struct AvrdudeProgrammer<R: ToolRunner> {
    runner: R,
    program: String,
    config_file: Option<PathBuf>,
}

impl<R: ToolRunner> AvrdudeProgrammer<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: "avrdude".to_string(),
            config_file: None,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Use an explicit `avrdude.conf` instead of the tool's built-in one.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    pub fn invocation(&self, request: &FlashRequest) -> Invocation {
        let mut inv = Invocation::new(&self.program);
        if let Some(ref conf) = self.config_file {
            inv = inv.arg(format!("-C{}", conf.display()));
        }
        inv.args(["-p", request.mcu.as_str()])
            .args(["-c", request.family.programmer_id()])
            .arg("-P")
            .arg(request.port.display().to_string())
            .arg("-b")
            .arg(request.baud.to_string())
            .arg("-D")
            .arg("-U")
            .arg(format!("flash:w:{}:i", request.image.display()))
            .timeout(request.timeout)
    }
}

#[async_trait]
impl<R: ToolRunner> Programmer for AvrdudeProgrammer<R> {
    async fn flash(&self, request: &FlashRequest) -> Result<ToolOutput, ToolError> {
        let invocation = self.invocation(request);
        tracing::debug!(command = %invocation, "flashing");
        self.runner.run(&invocation).await
    }

    async fn reset_touch(&self, port: &Path) -> std::io::Result<()> {
        let link = SystemConnector
            .open(port, 1200)
            .await
            .map_err(std::io::Error::other)?;
        drop(link);
        tokio::time::sleep(TOUCH_SETTLE).await;
        Ok(())
    }
}
