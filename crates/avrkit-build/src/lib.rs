//! Build orchestration for avrkit projects.
//!
//! [`Builder::build`] runs a strictly sequential pipeline:
//! classify -> compile entry -> compile project sources -> compile core
//! (framework builds) -> link -> extract image -> size report. Every
//! external tool goes through an [`avrkit_core::ToolRunner`], and every
//! failure ends up in the returned [`CompileResult`] rather than an `Err`.

pub mod classify;
pub mod command;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod result;
pub mod size;

pub use classify::{classify, Classification, ProjectKind};
pub use error::BuildError;
pub use options::BuildOptions;
pub use pipeline::{clean, Builder};
pub use result::{BuildStage, CompileResult, SkippedSource};
pub use size::ImageSize;
