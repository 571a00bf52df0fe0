//! Bootloader protocol families.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, UploadError};

/// Bootloader families avrkit knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolFamily {
    /// STK500v1 bootloaders (optiboot and older ATmegaBOOT).
    Arduino,
    /// Caterina-style USB bootloaders on ATmega32U4 boards.
    Avr109,
}

impl ProtocolFamily {
    /// Family for a board's declared `upload.protocol`.
    pub fn from_protocol(protocol: &str) -> Result<Self> {
        match protocol.trim().to_ascii_lowercase().as_str() {
            "arduino" | "stk500" | "stk500v1" => Ok(ProtocolFamily::Arduino),
            "avr109" | "butterfly" => Ok(ProtocolFamily::Avr109),
            _ => Err(UploadError::UnsupportedProtocol {
                protocol: protocol.to_string(),
            }),
        }
    }

    /// Programmer id passed to the device-programming tool.
    pub fn programmer_id(self) -> &'static str {
        match self {
            ProtocolFamily::Arduino => "arduino",
            ProtocolFamily::Avr109 => "avr109",
        }
    }

    pub fn default_baud(self) -> u32 {
        match self {
            ProtocolFamily::Arduino => 115_200,
            ProtocolFamily::Avr109 => 57_600,
        }
    }

    /// Rates tried, in order, after a synchronization failure.
    ///
    /// Older STK500v1 bootloaders run at lower rates than optiboot. USB
    /// bootloaders ignore the rate, so avr109 has nothing to fall back to.
    pub fn fallback_bauds(self) -> &'static [u32] {
        match self {
            ProtocolFamily::Arduino => &[57_600, 19_200, 9_600],
            ProtocolFamily::Avr109 => &[],
        }
    }

    /// Whether the bootloader is entered by opening the port at 1200 baud
    /// and closing it again.
    pub fn needs_reset_touch(self) -> bool {
        matches!(self, ProtocolFamily::Avr109)
    }
}

impl fmt::Display for ProtocolFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.programmer_id())
    }
}
