//! Memory usage from the size tool's Berkeley-format report.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Memory consumed by a linked image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    /// Program memory: `.text` plus initialized `.data`.
    pub flash_bytes: u64,
    /// Static RAM: `.data` plus `.bss`.
    pub ram_bytes: u64,
}

fn row_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?m)^\s*(\d+)\s+(\d+)\s+(\d+)\s+\d+").ok())
        .as_ref()
}

/// Parse output such as:
///
/// ```text
///    text    data     bss     dec     hex filename
///     924       0       9     933     3a5 build/blink.elf
/// ```
pub fn parse_size(output: &str) -> Option<ImageSize> {
    let caps = row_pattern()?.captures(output)?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());
    let (text, data, bss) = (field(1)?, field(2)?, field(3)?);
    Some(ImageSize {
        flash_bytes: text + data,
        ram_bytes: data + bss,
    })
}
