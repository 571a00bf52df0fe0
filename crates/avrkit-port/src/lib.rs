//! Serial port coordination.
//!
//! A [`PortCoordinator`] is an owned registry of device paths. Each path has
//! at most one active [`PortLease`]; requests queue in FIFO order and every
//! release is followed by a settling delay before the next grant, because
//! the OS driver does not free the device synchronously with `close`.

pub mod coordinator;
pub mod error;
pub mod link;
pub mod telemetry;

pub use coordinator::{LeasePurpose, PortCoordinator, PortLease, PortStatus, DEFAULT_SETTLE_DELAY};
pub use error::PortError;
pub use link::{available_ports, Connector, SerialLink, SystemConnector};
pub use telemetry::{TelemetryConfig, TelemetryReader};
