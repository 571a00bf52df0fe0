//! Peripheral configuration model.
//!
//! A configuration is an ordered list of peripherals. Each peripheral is
//! either pin-scoped (attached to one or more pins, each with its own
//! settings) or global (a board-wide singleton). The scope is an explicit tag:
//!
//! ```toml
//! [[peripherals]]
//! scope = "pin"
//! kind = "gpio"
//! pins = [{ pin = "13", label = "LED_PIN", mode = "output", initial = "low" }]
//!
//! [[peripherals]]
//! scope = "global"
//! kind = "timer1"
//! prescaler = 64
//! compare = 249
//! interrupts = ["compare-a"]
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationIssue;

fn enabled_by_default() -> bool {
    true
}

/// The full peripheral configuration of a project, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    #[serde(default)]
    pub peripherals: Vec<Peripheral>,
}

/// A configured peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "kebab-case")]
pub enum Peripheral {
    Pin(PinPeripheral),
    Global(GlobalPeripheral),
}

impl Peripheral {
    pub fn is_enabled(&self) -> bool {
        match self {
            Peripheral::Pin(p) => p.enabled,
            Peripheral::Global(g) => g.enabled,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Peripheral::Pin(p) => p.kind.name(),
            Peripheral::Global(g) => g.kind.name(),
        }
    }

    /// Whether at least one interrupt is explicitly enabled.
    pub fn has_enabled_interrupt(&self) -> bool {
        match self {
            Peripheral::Pin(p) => match p.kind {
                PinKind::ExternalInterrupt => p.pins.iter().any(|pin| pin.interrupt),
                PinKind::Uart | PinKind::Spi | PinKind::I2c => p.interrupt,
                PinKind::Gpio | PinKind::Pwm | PinKind::Adc => false,
            },
            Peripheral::Global(g) => !g.interrupts.is_empty(),
        }
    }
}

/// Function of a pin-scoped peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinKind {
    Gpio,
    Pwm,
    Adc,
    ExternalInterrupt,
    Uart,
    Spi,
    I2c,
}

impl PinKind {
    pub fn name(self) -> &'static str {
        match self {
            PinKind::Gpio => "gpio",
            PinKind::Pwm => "pwm",
            PinKind::Adc => "adc",
            PinKind::ExternalInterrupt => "external-interrupt",
            PinKind::Uart => "uart",
            PinKind::Spi => "spi",
            PinKind::I2c => "i2c",
        }
    }

    /// Bus peripherals drive all their pins as one unit and initialize once.
    pub fn requires_all_pins(self) -> bool {
        !self.required_roles().is_empty()
    }

    /// Pin roles that must all be assigned for the peripheral to work.
    pub fn required_roles(self) -> &'static [&'static str] {
        match self {
            PinKind::Uart => &["rx", "tx"],
            PinKind::Spi => &["mosi", "miso", "sck"],
            PinKind::I2c => &["sda", "scl"],
            PinKind::Gpio | PinKind::Pwm | PinKind::Adc | PinKind::ExternalInterrupt => &[],
        }
    }
}

/// Direction/pull configuration of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinMode {
    #[default]
    Input,
    InputPullup,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Low,
    High,
}

/// Edge/level that fires an external interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    Low,
    #[default]
    Change,
    Rising,
    Falling,
}

/// A pin-scoped peripheral and its pins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PinPeripheral {
    pub kind: PinKind,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub pins: Vec<PinAssignment>,
    /// UART line rate.
    #[serde(default)]
    pub baud: Option<u32>,
    /// I2C/SPI bus clock.
    #[serde(default)]
    pub clock_hz: Option<u32>,
    /// Bus-level interrupt (UART event, SPI transfer complete, I2C receive).
    #[serde(default)]
    pub interrupt: bool,
    /// Drive the pins as one unit, initialized once. Unset means the
    /// kind's own rule.
    #[serde(default)]
    pub requires_all_pins: Option<bool>,
}

impl PinPeripheral {
    /// Whether the pins initialize together rather than one by one.
    pub fn requires_all_pins(&self) -> bool {
        self.requires_all_pins
            .unwrap_or_else(|| self.kind.requires_all_pins())
    }

    fn grouping_issue(&self) -> Option<String> {
        match (self.kind, self.requires_all_pins) {
            (PinKind::Uart | PinKind::Spi | PinKind::I2c, Some(false)) => {
                Some(format!("{} always drives its pins as one unit", self.kind.name()))
            }
            (PinKind::ExternalInterrupt, Some(true)) => {
                Some("external-interrupt pins have their own handlers; no grouping".into())
            }
            (PinKind::Gpio | PinKind::Pwm | PinKind::Adc, Some(true)) => {
                let first = self.pins.first()?;
                let shared = self.pins.iter().all(|pin| {
                    pin.mode == first.mode && pin.initial == first.initial && pin.duty == first.duty
                });
                (!shared)
                    .then(|| format!("grouped {} pins must share their settings", self.kind.name()))
            }
            _ => None,
        }
    }
}

/// One pin of a pin-scoped peripheral with its own settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PinAssignment {
    /// Pin identifier as written on the board (`13`, `D13`, `A0`).
    pub pin: String,
    /// Symbolic name emitted as a `#define`.
    #[serde(default)]
    pub label: Option<String>,
    /// Role within a bus peripheral (`rx`, `sda`, `sck`, ...).
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub mode: Option<PinMode>,
    #[serde(default)]
    pub initial: Option<Level>,
    /// PWM duty cycle, 0-255.
    #[serde(default)]
    pub duty: Option<u8>,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    /// Attach an interrupt handler to this pin.
    #[serde(default)]
    pub interrupt: bool,
}

impl PinAssignment {
    /// Pin identifier normalized for code: `D13` -> `13`, `a0` -> `A0`.
    pub fn code_pin(&self) -> String {
        let pin = self.pin.trim();
        if let Some(rest) = pin.strip_prefix(['D', 'd']) {
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                return rest.to_string();
            }
        }
        pin.to_ascii_uppercase()
    }

    /// Pin identifier usable inside a C identifier.
    pub fn ident_pin(&self) -> String {
        self.code_pin()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect()
    }
}

/// Function of a global peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalKind {
    Timer1,
    Timer2,
    Watchdog,
    AdcReference,
}

impl GlobalKind {
    pub fn name(self) -> &'static str {
        match self {
            GlobalKind::Timer1 => "timer1",
            GlobalKind::Timer2 => "timer2",
            GlobalKind::Watchdog => "watchdog",
            GlobalKind::AdcReference => "adc-reference",
        }
    }

    /// Hardware timer the peripheral owns, if any.
    pub fn timer_number(self) -> Option<u8> {
        match self {
            GlobalKind::Timer1 => Some(1),
            GlobalKind::Timer2 => Some(2),
            GlobalKind::Watchdog | GlobalKind::AdcReference => None,
        }
    }

    pub fn allowed_prescalers(self) -> &'static [u16] {
        match self {
            GlobalKind::Timer1 => &[1, 8, 64, 256, 1024],
            GlobalKind::Timer2 => &[1, 8, 32, 64, 128, 256, 1024],
            GlobalKind::Watchdog | GlobalKind::AdcReference => &[],
        }
    }

    pub fn allowed_interrupts(self) -> &'static [GlobalInterrupt] {
        match self {
            GlobalKind::Timer1 | GlobalKind::Timer2 => &[
                GlobalInterrupt::Overflow,
                GlobalInterrupt::CompareA,
                GlobalInterrupt::CompareB,
            ],
            GlobalKind::Watchdog => &[GlobalInterrupt::Timeout],
            GlobalKind::AdcReference => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobalInterrupt {
    Overflow,
    CompareA,
    CompareB,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdcReference {
    #[default]
    Default,
    Internal,
    External,
}

/// Watchdog timeouts supported by the hardware, in milliseconds.
pub const WATCHDOG_TIMEOUTS_MS: &[u16] = &[15, 30, 60, 120, 250, 500, 1000, 2000, 4000, 8000];

/// A board-wide singleton peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalPeripheral {
    pub kind: GlobalKind,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub prescaler: Option<u16>,
    /// Output-compare value; selects CTC mode when present.
    #[serde(default)]
    pub compare: Option<u16>,
    #[serde(default)]
    pub timeout_ms: Option<u16>,
    #[serde(default)]
    pub reference: Option<AdcReference>,
    #[serde(default)]
    pub interrupts: Vec<GlobalInterrupt>,
}

impl PeripheralConfig {
    /// Enabled peripherals in declaration order, with their original index.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Peripheral)> {
        self.peripherals
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_enabled())
    }

    /// Check the configuration for problems synthesis cannot paper over.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        let mut pin_owner: HashMap<String, usize> = HashMap::new();
        let mut global_owner: HashMap<GlobalKind, usize> = HashMap::new();

        for (idx, peripheral) in self.active() {
            let mut issue = |message: String| {
                issues.push(ValidationIssue {
                    peripheral: idx,
                    message,
                })
            };
            match peripheral {
                Peripheral::Pin(p) => {
                    if p.pins.is_empty() {
                        issue(format!("{} has no pins assigned", p.kind.name()));
                    }
                    if let Some(message) = p.grouping_issue() {
                        issue(message);
                    }
                    for role in p.kind.required_roles() {
                        let assigned = p.pins.iter().any(|pin| {
                            pin.role
                                .as_deref()
                                .is_some_and(|r| r.eq_ignore_ascii_case(role))
                        });
                        if !assigned {
                            issue(format!("{} requires a pin with role '{role}'", p.kind.name()));
                        }
                    }
                    for pin in &p.pins {
                        if pin.pin.trim().is_empty() {
                            issue("pin identifier is empty".into());
                            continue;
                        }
                        if pin.interrupt && p.kind != PinKind::ExternalInterrupt {
                            issue(format!(
                                "pin {} requests an interrupt but {} pins cannot carry one",
                                pin.pin,
                                p.kind.name()
                            ));
                        }
                        if let Some(previous) = pin_owner.insert(pin.code_pin(), idx) {
                            if previous != idx {
                                issue(format!(
                                    "pin {} is already used by peripheral #{previous}",
                                    pin.pin
                                ));
                            }
                        }
                    }
                }
                Peripheral::Global(g) => {
                    if let Some(previous) = global_owner.insert(g.kind, idx) {
                        issue(format!(
                            "{} is already configured by peripheral #{previous}",
                            g.kind.name()
                        ));
                    }
                    if let Some(prescaler) = g.prescaler {
                        if !g.kind.allowed_prescalers().contains(&prescaler) {
                            issue(format!(
                                "prescaler {prescaler} is not valid for {}",
                                g.kind.name()
                            ));
                        }
                    }
                    if g.kind == GlobalKind::Timer2 && g.compare.is_some_and(|c| c > 255) {
                        issue("timer2 compare value must fit in 8 bits".into());
                    }
                    if g.kind == GlobalKind::Watchdog {
                        let timeout = g.timeout_ms.unwrap_or(2000);
                        if !WATCHDOG_TIMEOUTS_MS.contains(&timeout) {
                            issue(format!("watchdog timeout {timeout} ms is not supported"));
                        }
                    }
                    for interrupt in &g.interrupts {
                        if !g.kind.allowed_interrupts().contains(interrupt) {
                            issue(format!(
                                "{} has no {interrupt:?} interrupt",
                                g.kind.name()
                            ));
                        }
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}
