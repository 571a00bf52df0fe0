//! Code synthesis for avrkit.
//!
//! Converts a declarative peripheral configuration into [`GeneratedCode`]:
//! include directives, declarations, the body of the generated
//! `pins_init_all()` entry point, and interrupt handler definitions.
//! Framework projects get Arduino core calls; bare-register projects get
//! direct register access on the ATmega328P pinout.
//!
//! Synthesis is pure and deterministic. Identical configurations produce
//! byte-identical output, which is what lets the section merger rewrite
//! generated regions without churning files.

pub mod error;
pub mod generated;
pub mod model;
pub mod register;
pub mod synthesize;

pub use avrkit_core::ProjectKind;
pub use error::{SynthError, ValidationIssue};
pub use generated::{GeneratedCode, INIT_ENTRY_POINT};
pub use model::{
    GlobalInterrupt, GlobalKind, GlobalPeripheral, PinAssignment, PinKind, PinMode, PinPeripheral,
    Level, Peripheral, PeripheralConfig, Trigger,
};
pub use register::PortBit;
pub use synthesize::synthesize;
