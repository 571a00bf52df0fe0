//! Shared plumbing for the avrkit firmware pipeline.
//!
//! Every pipeline stage that touches an external tool (cross-compiler, linker,
//! image extractor, device programmer) goes through the [`ToolRunner`] seam
//! defined here, so that stages can be exercised without the AVR toolchain
//! installed.

pub mod diagnostics;
pub mod error;
pub mod kind;
pub mod layout;
pub mod process;

pub use diagnostics::{CompilerDiagnostics, Severity};
pub use error::ToolError;
pub use kind::ProjectKind;
pub use layout::SourceLayout;
pub use process::{Invocation, SystemRunner, ToolOutput, ToolRunner};
