//! Firmware upload.
//!
//! [`Uploader::upload`] checks the image and port, takes a flash lease from
//! the [`avrkit_port::PortCoordinator`], then walks a [`BaudLadder`] for the
//! board's protocol family until an attempt succeeds or fails for a reason
//! other than bootloader synchronization. Every attempt's output is
//! classified against a versioned [`OutputPatterns`] table.

pub mod classify;
pub mod error;
pub mod ladder;
pub mod programmer;
pub mod protocol;
pub mod result;
pub mod uploader;

pub use classify::{classify_output, OutputPatterns, AVRDUDE_PATTERNS};
pub use error::UploadError;
pub use ladder::BaudLadder;
pub use programmer::{AvrdudeProgrammer, FlashRequest, Programmer};
pub use protocol::ProtocolFamily;
pub use result::{Attempt, UploadOutcome, UploadResult};
pub use uploader::{UploadOptions, Uploader};
