//! External tool invocation.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use crate::error::{Result, ToolError};

/// A fully resolved command line for an external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path.
    pub program: String,
    /// Arguments, already split.
    pub args: Vec<String>,
    /// Working directory (inherits the caller's when `None`).
    pub cwd: Option<PathBuf>,
    /// Wall-clock bound for the whole invocation.
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Value of the argument following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a tool that ran (successfully or not).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Whether the process reported success.
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    /// The invocation exceeded its timeout and was killed.
    pub timed_out: bool,
}

impl ToolOutput {
    /// Successful output carrying only the given stdout text.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            success: true,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Failed output carrying the given stderr text.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            success: false,
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    /// Output of an invocation killed at its timeout.
    pub fn timeout() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    /// Standard output and standard error joined, for pattern matching.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (true, _) => self.stderr.clone(),
            (_, true) => self.stdout.clone(),
            _ => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Runs external tools.
///
/// The pipeline never spawns processes directly; it hands an [`Invocation`]
/// to a runner so tests can substitute scripted output.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Runs tools as child processes on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        tracing::debug!(command = %invocation, "spawning tool");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = invocation.cwd {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ToolError::Missing {
                    program: invocation.program.clone(),
                }
            } else {
                ToolError::Spawn {
                    program: invocation.program.clone(),
                    source,
                }
            }
        })?;

        let wait = child.wait_with_output();
        let output = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        program = %invocation.program,
                        timeout_ms = limit.as_millis() as u64,
                        "tool exceeded its timeout and was killed"
                    );
                    return Ok(ToolOutput::timeout());
                }
            },
            None => wait.await,
        }
        .map_err(|source| ToolError::Io {
            program: invocation.program.clone(),
            source,
        })?;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let inv = Invocation::new("avr-gcc")
            .arg("-c")
            .arg("/tmp/my project/main.cpp");
        assert_eq!(inv.to_string(), "avr-gcc -c \"/tmp/my project/main.cpp\"");
    }

    #[test]
    fn value_of_finds_flag_argument() {
        let inv = Invocation::new("avr-g++").args(["-c", "a.cpp", "-o", "a.o"]);
        assert_eq!(inv.value_of("-o"), Some("a.o"));
        assert_eq!(inv.value_of("-x"), None);
    }

    #[test]
    fn combined_joins_streams() {
        let out = ToolOutput {
            stdout: "out".into(),
            stderr: "err".into(),
            ..ToolOutput::default()
        };
        assert_eq!(out.combined(), "out\nerr");
        assert_eq!(ToolOutput::failed(1, "only err").combined(), "only err");
    }

    #[tokio::test]
    async fn missing_program_is_reported() {
        let inv = Invocation::new("avrkit-definitely-not-a-real-tool");
        let err = SystemRunner.run(&inv).await.unwrap_err();
        assert!(matches!(err, ToolError::Missing { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_output_and_status() {
        let inv = Invocation::new("sh").args(["-c", "echo hello; echo oops >&2; exit 3"]);
        let out = SystemRunner.run(&inv).await.unwrap();
        assert!(!out.success);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_the_child() {
        let inv = Invocation::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(50));
        let out = SystemRunner.run(&inv).await.unwrap();
        assert!(out.timed_out);
        assert!(!out.success);
    }
}
