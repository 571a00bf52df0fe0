//! Built-in board presets.
//!
//! Presets are the defaults a board table overrides. They also define the
//! fallback MCU set: a board whose declared MCU fails validation always ends
//! up with one of these MCUs.

/// Static defaults for a known board id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub mcu: &'static str,
    pub f_cpu: &'static str,
    pub variant: &'static str,
    pub board_define: &'static str,
    pub protocol: &'static str,
    pub upload_speed: u32,
}

pub const BOARD_PRESETS: &[BoardPreset] = &[
    BoardPreset {
        id: "uno",
        name: "Arduino Uno",
        mcu: "atmega328p",
        f_cpu: "16000000L",
        variant: "standard",
        board_define: "AVR_UNO",
        protocol: "arduino",
        upload_speed: 115_200,
    },
    BoardPreset {
        id: "nano",
        name: "Arduino Nano",
        mcu: "atmega328p",
        f_cpu: "16000000L",
        variant: "eightanaloginputs",
        board_define: "AVR_NANO",
        protocol: "arduino",
        upload_speed: 115_200,
    },
    BoardPreset {
        id: "nano-old",
        name: "Arduino Nano (old bootloader)",
        mcu: "atmega328p",
        f_cpu: "16000000L",
        variant: "eightanaloginputs",
        board_define: "AVR_NANO",
        protocol: "arduino",
        upload_speed: 57_600,
    },
    BoardPreset {
        id: "pro-mini",
        name: "Arduino Pro Mini 5V",
        mcu: "atmega328p",
        f_cpu: "16000000L",
        variant: "eightanaloginputs",
        board_define: "AVR_PRO",
        protocol: "arduino",
        upload_speed: 57_600,
    },
    BoardPreset {
        id: "diecimila",
        name: "Arduino Diecimila",
        mcu: "atmega168",
        f_cpu: "16000000L",
        variant: "standard",
        board_define: "AVR_DUEMILANOVE",
        protocol: "arduino",
        upload_speed: 19_200,
    },
    BoardPreset {
        id: "leonardo",
        name: "Arduino Leonardo",
        mcu: "atmega32u4",
        f_cpu: "16000000L",
        variant: "leonardo",
        board_define: "AVR_LEONARDO",
        protocol: "avr109",
        upload_speed: 57_600,
    },
    BoardPreset {
        id: "micro",
        name: "Arduino Micro",
        mcu: "atmega32u4",
        f_cpu: "16000000L",
        variant: "micro",
        board_define: "AVR_MICRO",
        protocol: "avr109",
        upload_speed: 57_600,
    },
];

/// Preset used for board ids with no preset of their own.
pub const GENERIC_PRESET: &BoardPreset = &BOARD_PRESETS[0];

/// Look up the preset for a board id.
pub fn preset(board_id: &str) -> Option<&'static BoardPreset> {
    BOARD_PRESETS.iter().find(|p| p.id == board_id)
}

/// MCUs a resolved board may fall back to, deduplicated, in preset order.
pub fn default_mcu_set() -> Vec<&'static str> {
    let mut set: Vec<&'static str> = Vec::new();
    for p in BOARD_PRESETS {
        if !set.contains(&p.mcu) {
            set.push(p.mcu);
        }
    }
    set
}
