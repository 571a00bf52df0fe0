//! Which runtime a project is written against.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    /// Uses the Arduino core: core sources are built and board/arch
    /// defines are injected.
    #[default]
    Framework,
    /// Uses only `<avr/...>` headers: MCU and clock defines only.
    BareRegister,
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProjectKind::Framework => "framework",
            ProjectKind::BareRegister => "bare-register",
        })
    }
}
