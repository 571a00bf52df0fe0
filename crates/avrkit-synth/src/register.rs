//! Register-level emission for projects that do not use the Arduino core.
//!
//! Pins resolve against the ATmega328P standard pinout: Arduino numbers
//! 0-7 are `PD0`-`PD7`, 8-13 are `PB0`-`PB5`, 14-19 and `A0`-`A5` are
//! `PC0`-`PC5`. Port notation (`PB5`) is taken as written.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationIssue;
use crate::generated::GeneratedCode;
use crate::model::{
    AdcReference, Level, Peripheral, PeripheralConfig, PinAssignment, PinKind, PinMode,
    PinPeripheral, Trigger,
};

/// One bit of an I/O port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortBit {
    pub port: char,
    pub bit: u8,
}

impl PortBit {
    pub const fn new(port: char, bit: u8) -> Self {
        Self { port, bit }
    }

    /// Resolve a pin identifier, or `None` if the pin has no port bit.
    pub fn resolve(pin: &PinAssignment) -> Option<PortBit> {
        let code = pin.code_pin();
        let mut chars = code.chars();
        if let (Some('P'), Some(port @ ('B' | 'C' | 'D')), Some(bit), None) =
            (chars.next(), chars.next(), chars.next(), chars.next())
        {
            let bit = bit.to_digit(10).filter(|b| *b < 8)?;
            return Some(PortBit::new(port, bit as u8));
        }
        if let Some(analog) = code.strip_prefix('A') {
            let n: u8 = analog.parse().ok()?;
            return (n < 6).then_some(PortBit::new('C', n));
        }
        match code.parse::<u8>().ok()? {
            n @ 0..=7 => Some(PortBit::new('D', n)),
            n @ 8..=13 => Some(PortBit::new('B', n - 8)),
            n @ 14..=19 => Some(PortBit::new('C', n - 14)),
            _ => None,
        }
    }

    fn mask(self) -> String {
        format!("(1 << {self})")
    }
}

impl fmt::Display for PortBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}{}", self.port, self.bit)
    }
}

/// A hardware output-compare channel able to drive a PWM pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PwmChannel {
    timer: u8,
    channel: char,
}

fn pwm_channel(at: PortBit) -> Option<PwmChannel> {
    let (timer, channel) = match (at.port, at.bit) {
        ('D', 6) => (0, 'A'),
        ('D', 5) => (0, 'B'),
        ('B', 1) => (1, 'A'),
        ('B', 2) => (1, 'B'),
        ('B', 3) => (2, 'A'),
        ('D', 3) => (2, 'B'),
        _ => return None,
    };
    Some(PwmChannel { timer, channel })
}

/// External interrupt number wired to a pin.
fn external_interrupt(at: PortBit) -> Option<u8> {
    match (at.port, at.bit) {
        ('D', 2) => Some(0),
        ('D', 3) => Some(1),
        _ => None,
    }
}

/// Fixed pins of the on-chip bus controllers, by role.
fn bus_pin(kind: PinKind, role: &str) -> Option<PortBit> {
    let at = match (kind, role.to_ascii_lowercase().as_str()) {
        (PinKind::Uart, "rx") => PortBit::new('D', 0),
        (PinKind::Uart, "tx") => PortBit::new('D', 1),
        (PinKind::Spi, "ss") => PortBit::new('B', 2),
        (PinKind::Spi, "mosi") => PortBit::new('B', 3),
        (PinKind::Spi, "miso") => PortBit::new('B', 4),
        (PinKind::Spi, "sck") => PortBit::new('B', 5),
        (PinKind::I2c, "sda") => PortBit::new('C', 4),
        (PinKind::I2c, "scl") => PortBit::new('C', 5),
        _ => return None,
    };
    Some(at)
}

/// Problems that only matter when the registers are driven directly.
pub(crate) fn check(config: &PeripheralConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let timers_in_use: Vec<u8> = config
        .active()
        .filter_map(|(_, p)| match p {
            Peripheral::Global(g) => g.kind.timer_number(),
            Peripheral::Pin(_) => None,
        })
        .collect();

    for (idx, peripheral) in config.active() {
        let Peripheral::Pin(p) = peripheral else {
            continue;
        };
        let mut issue = |message: String| {
            issues.push(ValidationIssue {
                peripheral: idx,
                message,
            })
        };
        for pin in &p.pins {
            let Some(at) = PortBit::resolve(pin) else {
                issue(format!("pin {} has no port bit on this board", pin.pin));
                continue;
            };
            match p.kind {
                PinKind::Pwm => match pwm_channel(at) {
                    None => issue(format!("pin {} ({at}) has no PWM channel", pin.pin)),
                    Some(ch) if timers_in_use.contains(&ch.timer) => issue(format!(
                        "pin {} needs timer{}, which is configured as a global peripheral",
                        pin.pin, ch.timer
                    )),
                    Some(_) => {}
                },
                PinKind::Adc if at.port != 'C' => {
                    issue(format!("pin {} ({at}) is not an analog input", pin.pin))
                }
                PinKind::ExternalInterrupt if pin.interrupt && external_interrupt(at).is_none() => {
                    issue(format!("pin {} ({at}) has no external interrupt line", pin.pin))
                }
                PinKind::Uart | PinKind::Spi | PinKind::I2c => {
                    let Some(role) = pin.role.as_deref() else {
                        issue(format!("{} pin {} has no role", p.kind.name(), pin.pin));
                        continue;
                    };
                    match bus_pin(p.kind, role) {
                        Some(fixed) if fixed == at => {}
                        Some(fixed) => issue(format!(
                            "{} {role} is wired to {fixed}, not {}",
                            p.kind.name(),
                            pin.pin
                        )),
                        None => issue(format!("{} has no '{role}' pin", p.kind.name())),
                    }
                }
                _ => {}
            }
        }
    }
    issues
}

/// Pin aliases: the bit plus its port, direction and input registers.
pub(crate) fn declare_label(code: &mut GeneratedCode, name: &str, at: PortBit) {
    code.declare(format!("#define {name} {at}"));
    code.declare(format!("#define {name}_PORT PORT{}", at.port));
    code.declare(format!("#define {name}_DDR DDR{}", at.port));
    code.declare(format!("#define {name}_IN PIN{}", at.port));
}

fn set_bits(code: &mut GeneratedCode, register: &str, bits: &[PortBit]) {
    let mask: Vec<String> = bits.iter().map(|b| b.mask()).collect();
    code.init(format!("{register} |= {};", mask.join(" | ")));
}

fn clear_bits(code: &mut GeneratedCode, register: &str, bits: &[PortBit]) {
    let mask: Vec<String> = bits.iter().map(|b| b.mask()).collect();
    if mask.len() == 1 {
        code.init(format!("{register} &= ~{};", mask[0]));
    } else {
        code.init(format!("{register} &= ~({});", mask.join(" | ")));
    }
}

/// Resolved pins of a peripheral; unresolvable pins were rejected by
/// [`check`].
fn resolved(p: &PinPeripheral) -> Vec<(&PinAssignment, PortBit)> {
    p.pins
        .iter()
        .filter_map(|pin| PortBit::resolve(pin).map(|at| (pin, at)))
        .collect()
}

/// Emit direction and level setup for pins sharing one configuration.
/// Bits on the same port are combined into one statement per register.
fn digital(code: &mut GeneratedCode, mode: PinMode, initial: Option<Level>, bits: &[PortBit]) {
    let mut by_port: BTreeMap<char, Vec<PortBit>> = BTreeMap::new();
    for at in bits {
        by_port.entry(at.port).or_default().push(*at);
    }
    for (port, bits) in by_port {
        let ddr = format!("DDR{port}");
        let out = format!("PORT{port}");
        match mode {
            PinMode::Output => {
                set_bits(code, &ddr, &bits);
                match initial {
                    Some(Level::High) => set_bits(code, &out, &bits),
                    Some(Level::Low) => clear_bits(code, &out, &bits),
                    None => {}
                }
            }
            PinMode::Input => clear_bits(code, &ddr, &bits),
            PinMode::InputPullup => {
                clear_bits(code, &ddr, &bits);
                set_bits(code, &out, &bits);
            }
        }
    }
}

pub(crate) fn gpio(p: &PinPeripheral, code: &mut GeneratedCode) {
    let pins = resolved(p);
    if p.requires_all_pins() {
        let Some((first, _)) = pins.first() else {
            return;
        };
        let bits: Vec<PortBit> = pins.iter().map(|(_, at)| *at).collect();
        digital(code, first.mode.unwrap_or_default(), first.initial, &bits);
        return;
    }
    for (pin, at) in pins {
        digital(code, pin.mode.unwrap_or_default(), pin.initial, &[at]);
    }
}

pub(crate) fn pwm(p: &PinPeripheral, code: &mut GeneratedCode) {
    let pins = resolved(p);
    if p.requires_all_pins() {
        let bits: Vec<PortBit> = pins.iter().map(|(_, at)| *at).collect();
        digital(code, PinMode::Output, None, &bits);
    }
    for (pin, at) in pins {
        let Some(PwmChannel { timer, channel }) = pwm_channel(at) else {
            continue;
        };
        if !p.requires_all_pins() {
            digital(code, PinMode::Output, None, &[at]);
        }
        // Fast PWM, 8-bit, clock/64.
        let (wgm_a, control_b) = match timer {
            0 => ("(1 << WGM01) | (1 << WGM00)", "(1 << CS01) | (1 << CS00)"),
            1 => ("(1 << WGM10)", "(1 << WGM12) | (1 << CS11) | (1 << CS10)"),
            _ => ("(1 << WGM21) | (1 << WGM20)", "(1 << CS22)"),
        };
        code.init(format!("TCCR{timer}A |= (1 << COM{timer}{channel}1) | {wgm_a};"));
        code.init(format!("TCCR{timer}B |= {control_b};"));
        code.init(format!("OCR{timer}{channel} = {};", pin.duty.unwrap_or(0)));
    }
}

pub(crate) fn adc(p: &PinPeripheral, code: &mut GeneratedCode) {
    let bits: Vec<PortBit> = resolved(p).into_iter().map(|(_, at)| at).collect();
    if bits.is_empty() {
        return;
    }
    let disable: Vec<String> = bits.iter().map(|at| format!("(1 << ADC{}D)", at.bit)).collect();
    if p.requires_all_pins() {
        clear_bits(code, "DDRC", &bits);
        code.init(format!("DIDR0 |= {};", disable.join(" | ")));
    } else {
        for (at, disable) in bits.iter().zip(&disable) {
            clear_bits(code, "DDRC", &[*at]);
            code.init(format!("DIDR0 |= {disable};"));
        }
    }
    code.init("ADCSRA |= (1 << ADEN) | (1 << ADPS2) | (1 << ADPS1) | (1 << ADPS0);");
}

pub(crate) fn external_interrupts(p: &PinPeripheral, code: &mut GeneratedCode) {
    for (pin, at) in resolved(p) {
        let mode = match pin.mode {
            Some(PinMode::InputPullup) => PinMode::InputPullup,
            _ => PinMode::Input,
        };
        digital(code, mode, None, &[at]);
        if !pin.interrupt {
            continue;
        }
        let Some(n) = external_interrupt(at) else {
            continue;
        };
        let sense = match pin.trigger.unwrap_or_default() {
            Trigger::Low => "0".to_string(),
            Trigger::Change => format!("(1 << ISC{n}0)"),
            Trigger::Falling => format!("(1 << ISC{n}1)"),
            Trigger::Rising => format!("(1 << ISC{n}1) | (1 << ISC{n}0)"),
        };
        code.init(format!(
            "EICRA = (EICRA & ~((1 << ISC{n}1) | (1 << ISC{n}0))) | {sense};"
        ));
        code.init(format!("EIMSK |= (1 << INT{n});"));
        let handler = format!("on_pin_{}_interrupt", pin.ident_pin());
        crate::synthesize::weak_handler(code, &handler, "void");
        crate::synthesize::vector_isr(code, &format!("INT{n}_vect"), &format!("{handler}()"));
    }
}

pub(crate) fn uart(p: &PinPeripheral, code: &mut GeneratedCode) {
    let baud = p.baud.unwrap_or(9600);
    code.init(format!("UBRR0 = F_CPU / 16UL / {baud}UL - 1;"));
    let mut enable = "(1 << RXEN0) | (1 << TXEN0)".to_string();
    if p.interrupt {
        enable.push_str(" | (1 << RXCIE0)");
    }
    code.init(format!("UCSR0B = {enable};"));
    code.init("UCSR0C = (1 << UCSZ01) | (1 << UCSZ00);");
    if p.interrupt {
        crate::synthesize::weak_handler(code, "on_uart_receive", "void");
        crate::synthesize::vector_isr(code, "USART_RX_vect", "on_uart_receive()");
    }
}

pub(crate) fn spi(p: &PinPeripheral, code: &mut GeneratedCode) {
    // SS stays an output so the controller cannot drop out of master mode.
    digital(
        code,
        PinMode::Output,
        None,
        &[PortBit::new('B', 2), PortBit::new('B', 3), PortBit::new('B', 5)],
    );
    let mut control = "(1 << SPE) | (1 << MSTR)".to_string();
    if p.interrupt {
        control.push_str(" | (1 << SPIE)");
    }
    code.init(format!("SPCR = {control};"));
    if p.interrupt {
        crate::synthesize::weak_handler(code, "on_spi_transfer_complete", "void");
        crate::synthesize::vector_isr(code, "SPI_STC_vect", "on_spi_transfer_complete()");
    }
}

pub(crate) fn i2c(p: &PinPeripheral, code: &mut GeneratedCode) {
    let clock = p.clock_hz.unwrap_or(100_000);
    code.init("TWSR = 0;");
    code.init(format!("TWBR = (F_CPU / {clock}UL - 16) / 2;"));
    let mut control = "(1 << TWEN)".to_string();
    if p.interrupt {
        control.push_str(" | (1 << TWIE)");
    }
    code.init(format!("TWCR = {control};"));
    if p.interrupt {
        crate::synthesize::weak_handler(code, "on_twi_event", "void");
        crate::synthesize::vector_isr(code, "TWI_vect", "on_twi_event()");
    }
}

pub(crate) fn adc_reference(reference: AdcReference, code: &mut GeneratedCode) {
    let bits = match reference {
        AdcReference::Default => "(1 << REFS0)",
        AdcReference::Internal => "(1 << REFS1) | (1 << REFS0)",
        AdcReference::External => "0",
    };
    code.init(format!(
        "ADMUX = (ADMUX & ~((1 << REFS1) | (1 << REFS0))) | {bits};"
    ));
}
