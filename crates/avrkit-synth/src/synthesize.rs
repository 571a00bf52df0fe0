//! Peripheral configuration to code fragments.

use avrkit_core::ProjectKind;

use crate::error::{Result, SynthError};
use crate::generated::GeneratedCode;
use crate::model::{
    AdcReference, GlobalInterrupt, GlobalKind, GlobalPeripheral, Level, Peripheral,
    PeripheralConfig, PinAssignment, PinKind, PinMode, PinPeripheral, Trigger,
};
use crate::register::{self, PortBit};

/// Synthesize code for every enabled peripheral, in declaration order.
///
/// `target` selects the runtime the code is written against: Arduino core
/// calls for framework projects, direct register access otherwise.
/// Peripherals that drive their pins as one unit initialize once; other
/// pin-scoped peripherals initialize per pin. Interrupt handlers are only
/// emitted for explicitly enabled interrupts.
pub fn synthesize(config: &PeripheralConfig, target: ProjectKind) -> Result<GeneratedCode> {
    config
        .validate()
        .map_err(|issues| SynthError::Invalid { issues })?;
    if target == ProjectKind::BareRegister {
        let issues = register::check(config);
        if !issues.is_empty() {
            return Err(SynthError::Invalid { issues });
        }
    }

    let mut code = GeneratedCode::for_target(target);
    code.include(match target {
        ProjectKind::Framework => "<Arduino.h>",
        ProjectKind::BareRegister => "<avr/io.h>",
    });
    code.declare(GeneratedCode::entry_point_prototype());

    let mut enable_global_interrupts = false;
    for (_, peripheral) in config.active() {
        match peripheral {
            Peripheral::Pin(p) => synthesize_pin_peripheral(p, &mut code),
            Peripheral::Global(g) => synthesize_global_peripheral(g, &mut code),
        }
        enable_global_interrupts |= match (target, peripheral) {
            (ProjectKind::Framework, Peripheral::Pin(_)) => false,
            _ => peripheral.has_enabled_interrupt(),
        };
    }
    if enable_global_interrupts {
        code.include("<avr/interrupt.h>");
        code.init("sei();");
    }

    tracing::debug!(
        %target,
        includes = code.includes.len(),
        init_lines = code.init_body.lines().count(),
        isr = code.has_isr(),
        "synthesized peripheral code"
    );
    Ok(code)
}

fn synthesize_pin_peripheral(p: &PinPeripheral, code: &mut GeneratedCode) {
    for pin in &p.pins {
        let Some(ref label) = pin.label else {
            continue;
        };
        let name = macro_name(label);
        match code.target {
            ProjectKind::Framework => code.declare(format!("#define {name} {}", pin.code_pin())),
            ProjectKind::BareRegister => {
                if let Some(at) = PortBit::resolve(pin) {
                    register::declare_label(code, &name, at);
                }
            }
        }
    }

    if code.target == ProjectKind::BareRegister {
        match p.kind {
            PinKind::Gpio => register::gpio(p, code),
            PinKind::Pwm => register::pwm(p, code),
            PinKind::Adc => register::adc(p, code),
            PinKind::ExternalInterrupt => register::external_interrupts(p, code),
            PinKind::Uart => register::uart(p, code),
            PinKind::Spi => register::spi(p, code),
            PinKind::I2c => register::i2c(p, code),
        }
        return;
    }

    match p.kind {
        PinKind::Uart => synthesize_uart(p, code),
        PinKind::Spi => synthesize_spi(p, code),
        PinKind::I2c => synthesize_i2c(p, code),
        PinKind::Gpio | PinKind::Pwm | PinKind::Adc if p.requires_all_pins() => {
            synthesize_pin_group(p, code)
        }
        PinKind::Gpio | PinKind::Pwm | PinKind::Adc | PinKind::ExternalInterrupt => {
            for pin in &p.pins {
                synthesize_pin(p.kind, pin, code);
            }
        }
    }
}

/// One loop over all pins of a unit; validation guarantees they share
/// their settings.
fn synthesize_pin_group(p: &PinPeripheral, code: &mut GeneratedCode) {
    let Some(first) = p.pins.first() else {
        return;
    };
    let pins: Vec<String> = p.pins.iter().map(PinAssignment::code_pin).collect();
    let mut body = Vec::new();
    match p.kind {
        PinKind::Gpio => {
            let mode = first.mode.unwrap_or_default();
            body.push(format!("pinMode(pins[i], {});", mode_literal(mode)));
            if let (PinMode::Output, Some(level)) = (mode, first.initial) {
                body.push(format!("digitalWrite(pins[i], {});", level_literal(level)));
            }
        }
        PinKind::Pwm => {
            body.push("pinMode(pins[i], OUTPUT);".to_string());
            body.push(format!("analogWrite(pins[i], {});", first.duty.unwrap_or(0)));
        }
        _ => body.push("pinMode(pins[i], INPUT);".to_string()),
    }

    code.init("{");
    code.init(format!("    static const uint8_t pins[] = {{{}}};", pins.join(", ")));
    code.init("    for (uint8_t i = 0; i < sizeof(pins); i++) {");
    for line in body {
        code.init(format!("        {line}"));
    }
    code.init("    }");
    code.init("}");
}

fn synthesize_pin(kind: PinKind, pin: &PinAssignment, code: &mut GeneratedCode) {
    let id = pin.code_pin();
    match kind {
        PinKind::Gpio => {
            let mode = pin.mode.unwrap_or_default();
            code.init(format!("pinMode({id}, {});", mode_literal(mode)));
            if let (PinMode::Output, Some(level)) = (mode, pin.initial) {
                code.init(format!("digitalWrite({id}, {});", level_literal(level)));
            }
        }
        PinKind::Pwm => {
            code.init(format!("pinMode({id}, OUTPUT);"));
            code.init(format!("analogWrite({id}, {});", pin.duty.unwrap_or(0)));
        }
        PinKind::Adc => code.init(format!("pinMode({id}, INPUT);")),
        PinKind::ExternalInterrupt => synthesize_external_interrupt(pin, code),
        // Buses never reach per-pin emission.
        PinKind::Uart | PinKind::Spi | PinKind::I2c => {}
    }
}

fn synthesize_external_interrupt(pin: &PinAssignment, code: &mut GeneratedCode) {
    let id = pin.code_pin();
    let mode = match pin.mode {
        Some(PinMode::InputPullup) => "INPUT_PULLUP",
        _ => "INPUT",
    };
    code.init(format!("pinMode({id}, {mode});"));
    if !pin.interrupt {
        return;
    }
    let handler = format!("on_pin_{}_interrupt", pin.ident_pin());
    code.init(format!(
        "attachInterrupt(digitalPinToInterrupt({id}), {handler}, {});",
        trigger_literal(pin.trigger.unwrap_or_default())
    ));
    weak_handler(code, &handler, "void");
}

/// The core polls `serialEvent()` with C++ linkage, so it forwards to a
/// handler declared in the generated header.
fn synthesize_uart(p: &PinPeripheral, code: &mut GeneratedCode) {
    code.init(format!("Serial.begin({});", p.baud.unwrap_or(9600)));
    if p.interrupt {
        weak_handler(code, "on_uart_receive", "void");
        code.isr("void serialEvent(void) {");
        code.isr("    on_uart_receive();");
        code.isr("}");
    }
}

fn synthesize_spi(p: &PinPeripheral, code: &mut GeneratedCode) {
    code.include("<SPI.h>");
    code.init("SPI.begin();");
    if p.interrupt {
        code.include("<avr/interrupt.h>");
        code.init("SPI.attachInterrupt();");
        weak_handler(code, "on_spi_transfer_complete", "void");
        vector_isr(code, "SPI_STC_vect", "on_spi_transfer_complete()");
    }
}

fn synthesize_i2c(p: &PinPeripheral, code: &mut GeneratedCode) {
    code.include("<Wire.h>");
    code.init("Wire.begin();");
    if let Some(clock) = p.clock_hz {
        code.init(format!("Wire.setClock({clock}UL);"));
    }
    if p.interrupt {
        code.init("Wire.onReceive(on_i2c_receive);");
        weak_handler(code, "on_i2c_receive", "int count");
    }
}

fn synthesize_global_peripheral(g: &GlobalPeripheral, code: &mut GeneratedCode) {
    match g.kind {
        GlobalKind::Timer1 | GlobalKind::Timer2 => synthesize_timer(g, code),
        GlobalKind::Watchdog => {
            code.include("<avr/wdt.h>");
            code.init(format!("wdt_enable({});", watchdog_literal(g.timeout_ms.unwrap_or(2000))));
            if g.interrupts.contains(&GlobalInterrupt::Timeout) {
                code.include("<avr/interrupt.h>");
                code.init("WDTCSR |= (1 << WDIE);");
                weak_handler(code, "on_watchdog_timeout", "void");
                vector_isr(code, "WDT_vect", "on_watchdog_timeout()");
            }
        }
        GlobalKind::AdcReference if code.target == ProjectKind::BareRegister => {
            register::adc_reference(g.reference.unwrap_or_default(), code)
        }
        GlobalKind::AdcReference => {
            let reference = match g.reference.unwrap_or_default() {
                AdcReference::Default => "DEFAULT",
                AdcReference::Internal => "INTERNAL",
                AdcReference::External => "EXTERNAL",
            };
            code.init(format!("analogReference({reference});"));
        }
    }
}

fn synthesize_timer(g: &GlobalPeripheral, code: &mut GeneratedCode) {
    let n = match g.kind {
        GlobalKind::Timer1 => 1,
        _ => 2,
    };
    code.include("<avr/io.h>");

    let mut clock_bits = prescaler_bits(g.kind, g.prescaler.unwrap_or(64));
    let (control_a, control_b) = if g.compare.is_some() {
        // CTC: WGM12 lives in TCCR1B, WGM21 in TCCR2A.
        if n == 1 {
            clock_bits.insert(0, "WGM12".to_string());
            ("0".to_string(), or_bits(&clock_bits))
        } else {
            ("(1 << WGM21)".to_string(), or_bits(&clock_bits))
        }
    } else {
        ("0".to_string(), or_bits(&clock_bits))
    };

    code.init(format!("TCCR{n}A = {control_a};"));
    code.init(format!("TCCR{n}B = {control_b};"));
    code.init(format!("TCNT{n} = 0;"));
    if let Some(compare) = g.compare {
        code.init(format!("OCR{n}A = {compare};"));
    }

    if g.interrupts.is_empty() {
        return;
    }
    code.include("<avr/interrupt.h>");
    let mask: Vec<String> = g
        .interrupts
        .iter()
        .filter_map(|i| match i {
            GlobalInterrupt::Overflow => Some(format!("TOIE{n}")),
            GlobalInterrupt::CompareA => Some(format!("OCIE{n}A")),
            GlobalInterrupt::CompareB => Some(format!("OCIE{n}B")),
            GlobalInterrupt::Timeout => None,
        })
        .collect();
    code.init(format!("TIMSK{n} = {};", or_bits(&mask)));

    for interrupt in &g.interrupts {
        let (suffix, vector) = match interrupt {
            GlobalInterrupt::Overflow => ("overflow", "OVF"),
            GlobalInterrupt::CompareA => ("compare_a", "COMPA"),
            GlobalInterrupt::CompareB => ("compare_b", "COMPB"),
            GlobalInterrupt::Timeout => continue,
        };
        let handler = format!("on_timer{n}_{suffix}");
        weak_handler(code, &handler, "void");
        vector_isr(code, &format!("TIMER{n}_{vector}_vect"), &format!("{handler}()"));
    }
}

/// Declare a handler and give it an empty weak definition the user can
/// override with a strong one anywhere in the project.
pub(crate) fn weak_handler(code: &mut GeneratedCode, name: &str, params: &str) {
    code.declare(format!("void {name}({params});"));
    if code.has_isr() {
        code.isr("");
    }
    code.isr(format!("__attribute__((weak)) void {name}({params}) {{}}"));
}

pub(crate) fn vector_isr(code: &mut GeneratedCode, vector: &str, call: &str) {
    code.isr(format!("ISR({vector}) {{"));
    code.isr(format!("    {call};"));
    code.isr("}");
}

fn prescaler_bits(kind: GlobalKind, prescaler: u16) -> Vec<String> {
    let (n, bits): (u8, &[u8]) = match (kind, prescaler) {
        (GlobalKind::Timer1, 1) => (1, &[0]),
        (GlobalKind::Timer1, 8) => (1, &[1]),
        (GlobalKind::Timer1, 256) => (1, &[2]),
        (GlobalKind::Timer1, 1024) => (1, &[2, 0]),
        (GlobalKind::Timer1, _) => (1, &[1, 0]),
        (_, 1) => (2, &[0]),
        (_, 8) => (2, &[1]),
        (_, 32) => (2, &[1, 0]),
        (_, 128) => (2, &[2, 0]),
        (_, 256) => (2, &[2, 1]),
        (_, 1024) => (2, &[2, 1, 0]),
        (_, _) => (2, &[2]),
    };
    bits.iter().map(|b| format!("CS{n}{b}")).collect()
}

fn or_bits(bits: &[String]) -> String {
    bits.iter()
        .map(|b| format!("(1 << {b})"))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn watchdog_literal(timeout_ms: u16) -> &'static str {
    match timeout_ms {
        15 => "WDTO_15MS",
        30 => "WDTO_30MS",
        60 => "WDTO_60MS",
        120 => "WDTO_120MS",
        250 => "WDTO_250MS",
        500 => "WDTO_500MS",
        1000 => "WDTO_1S",
        4000 => "WDTO_4S",
        8000 => "WDTO_8S",
        _ => "WDTO_2S",
    }
}

fn mode_literal(mode: PinMode) -> &'static str {
    match mode {
        PinMode::Input => "INPUT",
        PinMode::InputPullup => "INPUT_PULLUP",
        PinMode::Output => "OUTPUT",
    }
}

fn level_literal(level: Level) -> &'static str {
    match level {
        Level::Low => "LOW",
        Level::High => "HIGH",
    }
}

fn trigger_literal(trigger: Trigger) -> &'static str {
    match trigger {
        Trigger::Low => "LOW",
        Trigger::Change => "CHANGE",
        Trigger::Rising => "RISING",
        Trigger::Falling => "FALLING",
    }
}

fn macro_name(label: &str) -> String {
    let mut name: String = label
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &str) -> PeripheralConfig {
        toml::from_str(text).unwrap()
    }

    fn framework(text: &str) -> Result<GeneratedCode> {
        synthesize(&config(text), ProjectKind::Framework)
    }

    fn bare(text: &str) -> Result<GeneratedCode> {
        synthesize(&config(text), ProjectKind::BareRegister)
    }

    const MIXED: &str = r#"
[[peripherals]]
scope = "pin"
kind = "gpio"
pins = [
    { pin = "8", label = "led pin", mode = "output", initial = "low" },
    { pin = "7", mode = "input-pullup" },
]

[[peripherals]]
scope = "pin"
kind = "spi"
pins = [
    { pin = "11", role = "mosi" },
    { pin = "12", role = "miso" },
    { pin = "D13", role = "sck" },
]

[[peripherals]]
scope = "pin"
kind = "external-interrupt"
pins = [
    { pin = "2", trigger = "falling", interrupt = true },
    { pin = "3" },
]

[[peripherals]]
scope = "global"
kind = "timer1"
prescaler = 64
compare = 249
interrupts = ["compare-a"]
"#;

    #[test]
    fn synthesis_is_deterministic() {
        let cfg = config(MIXED);
        let a = synthesize(&cfg, ProjectKind::Framework).unwrap();
        let b = synthesize(&cfg, ProjectKind::Framework).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.init_body.as_bytes(), b.init_body.as_bytes());
        assert_eq!(a.isr_body.as_bytes(), b.isr_body.as_bytes());
    }

    #[test]
    fn init_follows_declaration_order() {
        let code = framework(MIXED).unwrap();
        let body = &code.init_body;
        let gpio = body.find("pinMode(8, OUTPUT);").unwrap();
        let spi = body.find("SPI.begin();").unwrap();
        let ext = body.find("attachInterrupt(").unwrap();
        let timer = body.find("TCCR1A = 0;").unwrap();
        assert!(gpio < spi && spi < ext && ext < timer);
        assert!(body.contains("    digitalWrite(8, LOW);\n"));
        assert!(body.contains("pinMode(7, INPUT_PULLUP);"));
        assert!(body.ends_with("    sei();\n"));
    }

    #[test]
    fn bus_initializes_once() {
        let code = framework(MIXED).unwrap();
        assert_eq!(code.init_body.matches("SPI.begin();").count(), 1);
        assert!(code.includes.contains("#include <SPI.h>"));
    }

    #[test]
    fn isr_only_for_enabled_interrupts() {
        let code = framework(MIXED).unwrap();
        assert!(code.isr_body.contains("void on_pin_2_interrupt(void) {}"));
        assert!(!code.isr_body.contains("on_pin_3_interrupt"));
        assert!(code
            .isr_body
            .contains("ISR(TIMER1_COMPA_vect) {\n    on_timer1_compare_a();\n}\n"));
        assert!(code
            .init_body
            .contains("attachInterrupt(digitalPinToInterrupt(2), on_pin_2_interrupt, FALLING);"));
    }

    #[test]
    fn no_interrupts_means_empty_isr_body() {
        let code = framework(
            r#"
[[peripherals]]
scope = "pin"
kind = "external-interrupt"
pins = [{ pin = "2" }]

[[peripherals]]
scope = "global"
kind = "timer2"
prescaler = 1024
"#,
        )
        .unwrap();
        assert!(code.isr_body.is_empty());
        assert!(!code.init_body.contains("sei();"));
        assert!(code
            .init_body
            .contains("TCCR2B = (1 << CS22) | (1 << CS21) | (1 << CS20);"));
    }

    #[test]
    fn timer1_ctc_mode_bits() {
        let code = framework(MIXED).unwrap();
        assert!(code
            .init_body
            .contains("TCCR1B = (1 << WGM12) | (1 << CS11) | (1 << CS10);"));
        assert!(code.init_body.contains("OCR1A = 249;"));
        assert!(code.init_body.contains("TIMSK1 = (1 << OCIE1A);"));
    }

    #[test]
    fn declarations_include_labels_and_handlers() {
        let code = framework(MIXED).unwrap();
        let decls = &code.declarations;
        assert!(decls.starts_with("void pins_init_all(void);\n"));
        assert!(decls.contains("#define LED_PIN 8\n"));
        assert!(decls.contains("void on_timer1_compare_a(void);\n"));
    }

    #[test]
    fn empty_config_still_declares_entry_point() {
        let code = synthesize(&PeripheralConfig::default(), ProjectKind::Framework).unwrap();
        assert_eq!(code.declarations, "void pins_init_all(void);\n");
        assert!(code.init_body.is_empty());
        assert_eq!(code.include_block(), "#include <Arduino.h>\n");
    }

    #[test]
    fn bus_settings_are_emitted() {
        let code = framework(
            r#"
[[peripherals]]
scope = "pin"
kind = "uart"
baud = 115200
interrupt = true
pins = [{ pin = "0", role = "rx" }, { pin = "1", role = "tx" }]

[[peripherals]]
scope = "pin"
kind = "i2c"
clock-hz = 400000
pins = [{ pin = "A4", role = "sda" }, { pin = "A5", role = "scl" }]

[[peripherals]]
scope = "global"
kind = "watchdog"
timeout-ms = 500
"#,
        )
        .unwrap();
        assert!(code.init_body.contains("Serial.begin(115200);"));
        assert!(code.init_body.contains("Wire.setClock(400000UL);"));
        assert!(code.init_body.contains("wdt_enable(WDTO_500MS);"));
        assert!(code.isr_body.contains("__attribute__((weak)) void on_uart_receive(void) {}"));
        assert!(code
            .isr_body
            .contains("void serialEvent(void) {\n    on_uart_receive();\n}\n"));
        assert!(code.declarations.contains("void on_uart_receive(void);\n"));
        assert!(!code.declarations.contains("serialEvent"));
        assert!(!code.isr_body.contains("on_i2c_receive"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = framework(
            r#"
[[peripherals]]
scope = "pin"
kind = "uart"
pins = [{ pin = "0", role = "rx" }]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("'tx'"));
    }

    const GROUPED: &str = r#"
[[peripherals]]
scope = "pin"
kind = "gpio"
requires-all-pins = true
pins = [
    { pin = "4", mode = "output", initial = "high" },
    { pin = "D5", mode = "output", initial = "high" },
]
"#;

    #[test]
    fn grouped_pins_initialize_once() {
        let code = framework(GROUPED).unwrap();
        let body = &code.init_body;
        assert!(body.contains("    static const uint8_t pins[] = {4, 5};\n"));
        assert_eq!(body.matches("pinMode(").count(), 1);
        assert!(body.contains("            digitalWrite(pins[i], HIGH);\n"));

        let code = bare(GROUPED).unwrap();
        assert_eq!(
            code.init_body,
            "    DDRD |= (1 << PD4) | (1 << PD5);\n    PORTD |= (1 << PD4) | (1 << PD5);\n"
        );
    }

    #[test]
    fn bare_register_code_avoids_the_core() {
        let code = bare(MIXED).unwrap();
        assert_eq!(code.target, ProjectKind::BareRegister);
        assert!(code.includes.contains("#include <avr/io.h>"));
        assert!(!code.includes.contains("#include <Arduino.h>"));
        assert!(!code.init_body.contains("pinMode"));
        assert!(!code.init_body.contains("SPI.begin"));

        let body = &code.init_body;
        assert!(body.starts_with("    DDRB |= (1 << PB0);\n    PORTB &= ~(1 << PB0);\n"));
        assert!(body.contains("    DDRD &= ~(1 << PD7);\n    PORTD |= (1 << PD7);\n"));
        assert!(body.contains("DDRB |= (1 << PB2) | (1 << PB3) | (1 << PB5);"));
        assert!(body.contains("SPCR = (1 << SPE) | (1 << MSTR);"));
        assert!(body.contains("EICRA = (EICRA & ~((1 << ISC01) | (1 << ISC00))) | (1 << ISC01);"));
        assert!(body.contains("EIMSK |= (1 << INT0);"));
        assert!(!body.contains("INT1"));
        assert!(body.ends_with("    sei();\n"));

        assert!(code.declarations.contains("#define LED_PIN PB0\n#define LED_PIN_PORT PORTB\n"));
        assert!(code
            .isr_body
            .contains("ISR(INT0_vect) {\n    on_pin_2_interrupt();\n}\n"));
    }

    #[test]
    fn bare_register_buses_and_pwm() {
        let code = bare(
            r#"
[[peripherals]]
scope = "pin"
kind = "uart"
baud = 9600
interrupt = true
pins = [{ pin = "0", role = "rx" }, { pin = "1", role = "tx" }]

[[peripherals]]
scope = "pin"
kind = "pwm"
pins = [{ pin = "6", duty = 128 }]

[[peripherals]]
scope = "pin"
kind = "i2c"
pins = [{ pin = "A4", role = "sda" }, { pin = "A5", role = "scl" }]

[[peripherals]]
scope = "global"
kind = "adc-reference"
reference = "internal"
"#,
        )
        .unwrap();
        let body = &code.init_body;
        assert!(body.contains("UBRR0 = F_CPU / 16UL / 9600UL - 1;"));
        assert!(body.contains("UCSR0B = (1 << RXEN0) | (1 << TXEN0) | (1 << RXCIE0);"));
        assert!(body.contains("TCCR0A |= (1 << COM0A1) | (1 << WGM01) | (1 << WGM00);"));
        assert!(body.contains("OCR0A = 128;"));
        assert!(body.contains("TWBR = (F_CPU / 100000UL - 16) / 2;"));
        assert!(body.contains(
            "ADMUX = (ADMUX & ~((1 << REFS1) | (1 << REFS0))) | (1 << REFS1) | (1 << REFS0);"
        ));
        assert!(body.ends_with("    sei();\n"));
        assert!(code
            .isr_body
            .contains("ISR(USART_RX_vect) {\n    on_uart_receive();\n}\n"));
        assert!(!code.isr_body.contains("serialEvent"));
    }

    #[test]
    fn bare_register_rejects_pins_without_hardware() {
        const MISWIRED: &str = r#"
[[peripherals]]
scope = "pin"
kind = "pwm"
pins = [{ pin = "13" }, { pin = "9" }]

[[peripherals]]
scope = "pin"
kind = "adc"
pins = [{ pin = "7" }]

[[peripherals]]
scope = "pin"
kind = "i2c"
pins = [{ pin = "A3", role = "sda" }, { pin = "A5", role = "scl" }]

[[peripherals]]
scope = "global"
kind = "timer1"
"#;
        let SynthError::Invalid { issues } = bare(MISWIRED).unwrap_err();
        let peripherals: Vec<usize> = issues.iter().map(|i| i.peripheral).collect();
        assert_eq!(peripherals, [0, 0, 1, 2]);
        assert!(issues[0].message.contains("no PWM channel"));
        assert!(issues[1].message.contains("timer1"));
        assert!(issues[3].message.contains("PC4"));

        // The same pins are fine for the Arduino core.
        assert!(framework(MISWIRED).is_ok());
    }
}
