//! Platform and board descriptor parsing.
//!
//! Descriptors are line-oriented `key=value` text files:
//! - a **platform descriptor** names the cross-compiler commands and flags,
//!   resolved into a [`ToolchainProfile`];
//! - a **board table** holds `<boardId>.`-scoped build parameters, resolved
//!   into a [`BoardProfile`].
//!
//! Resolution never fails. Missing files, unreadable files, absent keys and
//! invalid values all fall back to built-in defaults, and every fallback is
//! recorded as a [`Diagnostic`] on the returned [`Resolved`] value.

pub mod board;
pub mod error;
pub mod parse;
pub mod presets;
pub mod toolchain;

pub use board::{
    list_boards, load_board, parse_board, parse_board_config, BoardProfile, UploadSettings,
};
pub use error::DescriptorError;
pub use parse::{Diagnostic, DiagnosticSeverity, Resolved};
pub use presets::{default_mcu_set, BoardPreset, BOARD_PRESETS};
pub use toolchain::{load_toolchain, parse_toolchain, ToolchainProfile};
