//! Telemetry reader: streams text lines from a device while nobody needs to
//! flash it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::coordinator::{LeasePurpose, PortCoordinator, PortLease};
use crate::error::PortError;
use crate::link::{Connector, SerialLink};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub baud: u32,
    /// Wait before reopening after an open or read failure.
    pub retry_delay: Duration,
    pub channel_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            baud: 9600,
            retry_delay: Duration::from_secs(1),
            channel_capacity: 256,
        }
    }
}

/// Handle to a background reader task.
///
/// The task holds a telemetry lease on its port while reading. When a flash
/// lease is requested it closes the device, lets the flash proceed, and
/// resumes once the port has settled again. Dropping the handle stops the
/// task as well.
#[derive(Debug)]
pub struct TelemetryReader {
    path: PathBuf,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TelemetryReader {
    /// Start reading `path`. Complete lines, without their terminator, are
    /// delivered on the returned channel.
    pub fn spawn<C>(
        coordinator: PortCoordinator,
        path: impl Into<PathBuf>,
        config: TelemetryConfig,
        connector: C,
    ) -> (Self, mpsc::Receiver<String>)
    where
        C: Connector + 'static,
    {
        let path = path.into();
        let (lines_tx, lines_rx) = mpsc::channel(config.channel_capacity.max(1));
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(read_loop(
            coordinator,
            path.clone(),
            config,
            connector,
            lines_tx,
            stop_rx,
        ));
        (Self { path, stop, task }, lines_rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop reading and wait for the lease to be released.
    pub async fn stop(self) {
        self.stop.send_replace(true);
        if let Err(e) = self.task.await {
            tracing::warn!(port = %self.path.display(), "telemetry task ended abnormally: {e}");
        }
    }
}

enum SessionEnd {
    Stopped,
    Preempted,
    Closed,
    Failed(PortError),
}

async fn read_loop<C: Connector>(
    coordinator: PortCoordinator,
    path: PathBuf,
    config: TelemetryConfig,
    connector: C,
    lines: mpsc::Sender<String>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let lease = tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => return,
            lease = coordinator.request_lease(&path, LeasePurpose::Telemetry) => lease,
        };
        if lease.is_preempted() {
            lease.release();
            continue;
        }

        let link = match connector.open(&path, config.baud).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(port = %path.display(), "telemetry unavailable: {e}");
                lease.release();
                if wait_or_stop(&mut stop, config.retry_delay).await {
                    return;
                }
                continue;
            }
        };
        tracing::info!(port = %path.display(), baud = config.baud, "telemetry started");

        let end = session(&link, &lease, &lines, &mut stop).await;
        drop(link);
        lease.release();
        match end {
            SessionEnd::Stopped | SessionEnd::Closed => {
                tracing::info!(port = %path.display(), "telemetry stopped");
                return;
            }
            SessionEnd::Preempted => {
                tracing::info!(port = %path.display(), "telemetry yielding port for flashing");
            }
            SessionEnd::Failed(e) => {
                tracing::warn!("{e}");
                if wait_or_stop(&mut stop, config.retry_delay).await {
                    return;
                }
            }
        }
    }
}

/// Returns true if a stop was requested during the wait.
async fn wait_or_stop(stop: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = stop.wait_for(|stopped| *stopped) => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

async fn session<L: SerialLink>(
    link: &L,
    lease: &PortLease,
    lines: &mpsc::Sender<String>,
    stop: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let mut buf = [0u8; 256];
    let mut partial = Vec::new();
    loop {
        let read = tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => return SessionEnd::Stopped,
            _ = lease.preempted() => return SessionEnd::Preempted,
            read = link.read(&mut buf) => read,
        };
        let n = match read {
            Ok(0) => {
                return SessionEnd::Failed(PortError::Read {
                    path: lease.path().to_path_buf(),
                    source: std::io::ErrorKind::UnexpectedEof.into(),
                })
            }
            Ok(n) => n,
            Err(source) => {
                return SessionEnd::Failed(PortError::Read {
                    path: lease.path().to_path_buf(),
                    source,
                })
            }
        };
        partial.extend_from_slice(&buf[..n]);
        // A full channel must not keep the port from a waiting flash.
        for line in drain_lines(&mut partial) {
            tokio::select! {
                _ = stop.wait_for(|stopped| *stopped) => return SessionEnd::Stopped,
                _ = lease.preempted() => return SessionEnd::Preempted,
                sent = lines.send(line) => {
                    if sent.is_err() {
                        return SessionEnd::Closed;
                    }
                }
            }
        }
    }
}

/// Split complete lines off the front of `buf`, leaving any unterminated
/// tail in place.
fn drain_lines(buf: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(end) = buf.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buf.drain(..=end).collect();
        let text = String::from_utf8_lossy(&raw[..end]);
        lines.push(text.trim_end_matches('\r').to_string());
    }
    lines
}
