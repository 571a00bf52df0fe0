//! Section merging for avrkit.
//!
//! Generated code lives in marker-delimited regions of otherwise user-owned
//! source files. [`merge`] replaces the bytes between one marker pair and
//! leaves everything else alone; [`apply`] runs it over a project's generated
//! header, implementation file and entry file.

pub mod entry;
pub mod error;
pub mod marker;
pub mod merge;
pub mod project;

pub use entry::merge_entry;
pub use error::MergeError;
pub use marker::{locate, MarkedSection, Region};
pub use merge::{frame, merge, merge_at, merge_region, MergeOutcome, Placement};
pub use project::{apply, merge_header, merge_implementation, FileAction, FileChange, MergeReport};
