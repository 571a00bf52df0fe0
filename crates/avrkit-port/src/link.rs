//! Serial device access behind a trait, so readers can be tested without
//! hardware.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serial2_tokio::SerialPort;

use crate::error::{PortError, Result};

/// An open serial device.
#[async_trait]
pub trait SerialLink: Send + Sync {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    async fn write(&self, buf: &[u8]) -> io::Result<usize>;
}

#[async_trait]
impl SerialLink for SerialPort {
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        SerialPort::read(self, buf).await
    }

    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        SerialPort::write(self, buf).await
    }
}

/// Opens serial devices.
#[async_trait]
pub trait Connector: Send + Sync {
    type Link: SerialLink + 'static;

    async fn open(&self, path: &Path, baud: u32) -> Result<Self::Link>;
}

/// Opens real devices with `serial2-tokio`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemConnector;

#[async_trait]
impl Connector for SystemConnector {
    type Link = SerialPort;

    async fn open(&self, path: &Path, baud: u32) -> Result<SerialPort> {
        tracing::debug!(port = %path.display(), baud, "opening serial port");
        SerialPort::open(path, baud).map_err(|source| PortError::Open {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Serial devices present on this host.
pub fn available_ports() -> Result<Vec<PathBuf>> {
    SerialPort::available_ports().map_err(PortError::Enumerate)
}
