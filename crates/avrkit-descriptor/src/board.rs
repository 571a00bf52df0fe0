//! Board profile resolution from `<boardId>.`-scoped board tables.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::parse::{entries, read_descriptor, Diagnostic, Resolved};
use crate::presets::{preset, BoardPreset, BOARD_PRESETS, GENERIC_PRESET};

/// Upload parameters declared for a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSettings {
    /// Programmer protocol name (e.g. `arduino`, `avr109`).
    pub protocol: String,
    /// Default upload baud rate.
    pub speed: u32,
}

/// Build parameters of one board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardProfile {
    pub id: String,
    pub name: String,
    /// Validated MCU identifier, always matching `^(atmega|attiny)\d+`.
    pub mcu: String,
    /// Clock frequency literal as injected into `F_CPU` (e.g. `16000000L`).
    pub f_cpu: String,
    /// Pin layout variant directory name.
    pub variant: String,
    /// Token injected as `ARDUINO_<board_define>`.
    pub board_define: String,
    pub upload: UploadSettings,
}

impl BoardProfile {
    /// Profile built purely from a preset, keeping the requested id.
    pub fn from_preset(board_id: &str, preset: &BoardPreset) -> Self {
        let (name, board_define) = if preset.id == board_id {
            (preset.name.to_string(), preset.board_define.to_string())
        } else {
            (
                board_id.to_string(),
                format!("AVR_{}", board_id.to_ascii_uppercase().replace('-', "_")),
            )
        };
        Self {
            id: board_id.to_string(),
            name,
            mcu: preset.mcu.to_string(),
            f_cpu: preset.f_cpu.to_string(),
            variant: preset.variant.to_string(),
            board_define,
            upload: UploadSettings {
                protocol: preset.protocol.to_string(),
                speed: preset.upload_speed,
            },
        }
    }

    /// Clock frequency in Hz, parsed from the `f_cpu` literal.
    pub fn clock_hz(&self) -> Option<u64> {
        self.f_cpu
            .trim_end_matches(|c| c == 'L' || c == 'l' || c == 'U' || c == 'u')
            .parse()
            .ok()
    }
}

fn mcu_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(atmega|attiny)\d+").ok())
        .as_ref()
}

fn f_cpu_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\d+(UL|L|ul|l)?$").ok())
        .as_ref()
}

/// Whether an MCU identifier belongs to a supported family.
pub fn is_valid_mcu(mcu: &str) -> bool {
    mcu_pattern().is_some_and(|re| re.is_match(mcu))
}

/// Resolve a board profile from board-table text.
///
/// Keys are scoped by the `<boardId>.` prefix. Once the scope has been
/// entered, the first key belonging to another board ends it. Values
/// override the board's preset (or the generic preset for unknown ids);
/// invalid MCU and clock values are replaced by the preset's and reported.
pub fn parse_board(board_id: &str, text: &str) -> Resolved<BoardProfile> {
    let base = preset(board_id).unwrap_or(GENERIC_PRESET);
    let mut profile = BoardProfile::from_preset(board_id, base);
    let mut diagnostics = Vec::new();

    let prefix = format!("{board_id}.");
    let mut in_scope = false;
    let mut declared_mcu: Option<String> = None;

    for entry in entries(text) {
        let Some(sub_key) = entry.key.strip_prefix(&prefix) else {
            if in_scope && entry.key.contains('.') {
                break;
            }
            continue;
        };
        in_scope = true;

        match sub_key {
            "name" => profile.name = entry.value.to_string(),
            "build.mcu" => declared_mcu = Some(entry.value.to_string()),
            "build.f_cpu" => {
                if f_cpu_pattern().is_some_and(|re| re.is_match(entry.value)) {
                    profile.f_cpu = entry.value.to_string();
                } else {
                    diagnostics.push(Diagnostic::warning(format!(
                        "board '{board_id}': clock '{}' is not a numeric literal; using {}",
                        entry.value, profile.f_cpu
                    )));
                }
            }
            "build.variant" if !entry.value.is_empty() => {
                profile.variant = entry.value.to_string();
            }
            "build.board" if !entry.value.is_empty() => {
                profile.board_define = entry.value.to_string();
            }
            "upload.protocol" if !entry.value.is_empty() => {
                profile.upload.protocol = entry.value.to_string();
            }
            "upload.speed" => match entry.value.parse::<u32>() {
                Ok(speed) if speed > 0 => profile.upload.speed = speed,
                _ => diagnostics.push(Diagnostic::warning(format!(
                    "board '{board_id}': upload speed '{}' is invalid; using {}",
                    entry.value, profile.upload.speed
                ))),
            },
            _ => {}
        }
    }

    match declared_mcu {
        Some(mcu) if is_valid_mcu(&mcu) => profile.mcu = mcu,
        Some(mcu) => diagnostics.push(Diagnostic::warning(format!(
            "board '{board_id}': MCU '{mcu}' is not a supported AVR part; using {}",
            profile.mcu
        ))),
        None if in_scope => diagnostics.push(Diagnostic::warning(format!(
            "board '{board_id}': no build.mcu declared; using {}",
            profile.mcu
        ))),
        None if preset(board_id).is_none() => diagnostics.push(Diagnostic::warning(format!(
            "unknown board '{board_id}'; using {} defaults",
            GENERIC_PRESET.name
        ))),
        None => {}
    }

    for d in &diagnostics {
        tracing::warn!("{}", d.message);
    }
    Resolved {
        profile,
        diagnostics,
    }
}

/// Load a board table and resolve one board from it.
///
/// With no table (or an unreadable one) the board resolves from presets.
pub fn load_board(board_id: &str, table: Option<&Path>) -> Resolved<BoardProfile> {
    let Some(path) = table else {
        return parse_board(board_id, "");
    };
    match read_descriptor(path) {
        Ok(text) => parse_board(board_id, &text),
        Err(e) => {
            tracing::warn!("{e}; resolving board '{board_id}' from presets");
            let mut resolved = parse_board(board_id, "");
            resolved.diagnostics.insert(
                0,
                Diagnostic::warning(format!("{e}; resolving board from presets")),
            );
            resolved
        }
    }
}

/// Resolve a board with no descriptor on disk.
pub fn parse_board_config(board_id: &str) -> BoardProfile {
    load_board(board_id, None).profile
}

/// Board ids declared in a board table (first-appearance order), followed
/// by preset ids the table does not mention.
pub fn list_boards(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for entry in entries(text) {
        let declared = entry
            .key
            .strip_suffix(".name")
            .or_else(|| entry.key.strip_suffix(".build.mcu"));
        if let Some(id) = declared {
            if !id.contains('.') && !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
    }
    for p in BOARD_PRESETS {
        if !ids.iter().any(|known| known == p.id) {
            ids.push(p.id.to_string());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::default_mcu_set;

    const TABLE: &str = "\
# Board table
menu.cpu=Processor

uno.name=Arduino Uno
uno.build.mcu=atmega328p
uno.build.f_cpu=16000000L
uno.build.board=AVR_UNO
uno.build.variant=standard
uno.upload.protocol=arduino
uno.upload.speed=115200

custom.name=Custom Board
custom.build.mcu=attiny85
custom.build.f_cpu=8000000L
custom.build.variant=tiny8
custom.upload.protocol=arduino
custom.upload.speed=19200

broken.name=Broken
broken.build.mcu=esp32
broken.build.f_cpu=fast

nomcu.name=No MCU
nomcu.build.variant=standard
";

    #[test]
    fn uno_without_descriptor() {
        let p = parse_board_config("uno");
        assert_eq!(p.mcu, "atmega328p");
        assert_eq!(p.f_cpu, "16000000L");
        assert_eq!(p.variant, "standard");
        assert_eq!(p.clock_hz(), Some(16_000_000));
    }

    #[test]
    fn table_values_override_presets() {
        let resolved = parse_board("custom", TABLE);
        assert!(!resolved.has_warnings());
        let p = resolved.profile;
        assert_eq!(p.name, "Custom Board");
        assert_eq!(p.mcu, "attiny85");
        assert_eq!(p.f_cpu, "8000000L");
        assert_eq!(p.variant, "tiny8");
        assert_eq!(p.upload.speed, 19_200);
        assert_eq!(p.board_define, "AVR_CUSTOM");
    }

    #[test]
    fn invalid_mcu_falls_back_to_default_set() {
        let resolved = parse_board("broken", TABLE);
        assert!(resolved.has_warnings());
        assert_ne!(resolved.profile.mcu, "esp32");
        assert!(default_mcu_set().contains(&resolved.profile.mcu.as_str()));
        assert_eq!(resolved.profile.f_cpu, "16000000L");
    }

    #[test]
    fn absent_mcu_is_reported() {
        let resolved = parse_board("nomcu", TABLE);
        assert!(resolved
            .diagnostics
            .iter()
            .any(|d| d.message.contains("no build.mcu")));
        assert_eq!(resolved.profile.mcu, "atmega328p");
    }

    #[test]
    fn scope_ends_at_next_board() {
        // `uno.` keys after another board's keys are outside the scope.
        let text = "\
uno.build.mcu=atmega328p
other.build.mcu=attiny13
uno.build.variant=late
";
        let p = parse_board("uno", text).profile;
        assert_eq!(p.variant, "standard");
    }

    #[test]
    fn prefix_must_match_whole_id() {
        // `nano-old.` must not be read as part of `nano`.
        let text = "nano-old.build.mcu=atmega168\nnano.build.variant=v2\n";
        let p = parse_board("nano", text).profile;
        assert_eq!(p.mcu, "atmega328p");
        assert_eq!(p.variant, "v2");
    }

    #[test]
    fn unknown_board_uses_generic_preset() {
        let resolved = parse_board("mystery", "");
        assert!(resolved.has_warnings());
        assert_eq!(resolved.profile.mcu, "atmega328p");
        assert_eq!(resolved.profile.board_define, "AVR_MYSTERY");
    }

    #[test]
    fn unreadable_table_resolves_from_presets() {
        let resolved = load_board("leonardo", Some(Path::new("/nonexistent/boards.txt")));
        assert!(resolved.has_warnings());
        assert_eq!(resolved.profile.mcu, "atmega32u4");
        assert_eq!(resolved.profile.upload.protocol, "avr109");
    }

    #[test]
    fn load_table_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boards.txt");
        std::fs::write(&path, TABLE).unwrap();
        let p = load_board("custom", Some(&path)).profile;
        assert_eq!(p.mcu, "attiny85");
    }

    #[test]
    fn list_boards_orders_table_then_presets() {
        let ids = list_boards(TABLE);
        assert_eq!(&ids[..4], ["uno", "custom", "broken", "nomcu"]);
        assert!(ids.contains(&"leonardo".to_string()));
        assert_eq!(ids.iter().filter(|id| *id == "uno").count(), 1);
    }

    #[test]
    fn patterns_compile() {
        assert!(mcu_pattern().is_some());
        assert!(f_cpu_pattern().is_some());
    }

    #[test]
    fn mcu_pattern_accepts_families() {
        assert!(is_valid_mcu("atmega2560"));
        assert!(is_valid_mcu("attiny85"));
        assert!(!is_valid_mcu("at90usb1286"));
        assert!(!is_valid_mcu("ATMEGA328P"));
    }
}
