//! `avrkit monitor`: print lines received from the board.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use avrkit_port::{PortCoordinator, SystemConnector, TelemetryConfig, TelemetryReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::Project;

pub async fn run(project: &Project, port: Option<PathBuf>, baud: Option<u32>) -> Result<()> {
    let port = resolve_port(project, port)?;
    let coordinator = PortCoordinator::new();
    let (reader, lines) = spawn(project, &coordinator, &port, baud);
    eprintln!("Monitoring {} (Ctrl-C to stop)", port.display());
    let printer = forward(lines);
    interrupted().await?;
    reader.stop().await;
    printer.await.context("monitor output task")?;
    Ok(())
}

pub fn resolve_port(project: &Project, port: Option<PathBuf>) -> Result<PathBuf> {
    port.or_else(|| project.manifest.project.port.clone())
        .context("no serial port: pass --port or set `port` in [project]")
}

pub fn spawn(
    project: &Project,
    coordinator: &PortCoordinator,
    port: &Path,
    baud: Option<u32>,
) -> (TelemetryReader, mpsc::Receiver<String>) {
    let mut config = TelemetryConfig::default();
    if let Some(baud) = baud.or(project.manifest.project.monitor_baud) {
        config.baud = baud;
    }
    TelemetryReader::spawn(coordinator.clone(), port, config, SystemConnector)
}

/// Print every received line until the reader stops.
pub fn forward(mut lines: mpsc::Receiver<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(line) = lines.recv().await {
            println!("{line}");
        }
    })
}

pub async fn interrupted() -> Result<()> {
    tokio::signal::ctrl_c().await.context("listening for Ctrl-C")
}
