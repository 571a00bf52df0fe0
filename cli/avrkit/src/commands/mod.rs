//! CLI command implementations.

pub mod boards;
pub mod build;
pub mod clean;
pub mod generate;
pub mod init;
pub mod monitor;
pub mod upload;
