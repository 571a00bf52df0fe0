//! Toolchain profile: compiler, linker and image-extraction commands.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::parse::{entries, expand, read_descriptor, split_flags, unresolved, Diagnostic, Resolved};

/// Command names and flags for the AVR cross toolchain.
///
/// Immutable once resolved. Every field has a built-in default, so a profile
/// is always complete even when the descriptor is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolchainProfile {
    /// Directory prepended to every tool command (`compiler.path`).
    pub tool_dir: Option<PathBuf>,
    pub c_compiler: String,
    pub cpp_compiler: String,
    pub c_flags: Vec<String>,
    pub cpp_flags: Vec<String>,
    pub asm_flags: Vec<String>,
    pub link_flags: Vec<String>,
    pub objcopy: String,
    pub image_flags: Vec<String>,
    pub size_tool: String,
}

impl Default for ToolchainProfile {
    fn default() -> Self {
        Self {
            tool_dir: None,
            c_compiler: "avr-gcc".into(),
            cpp_compiler: "avr-g++".into(),
            c_flags: split_flags(
                "-c -g -Os -std=gnu11 -ffunction-sections -fdata-sections -MMD -flto \
                 -fno-fat-lto-objects",
            ),
            cpp_flags: split_flags(
                "-c -g -Os -std=gnu++11 -fpermissive -fno-exceptions -ffunction-sections \
                 -fdata-sections -fno-threadsafe-statics -Wno-error=narrowing -MMD -flto",
            ),
            asm_flags: split_flags("-c -g -x assembler-with-cpp -flto -MMD"),
            link_flags: split_flags("-Os -g -flto -fuse-linker-plugin -Wl,--gc-sections"),
            objcopy: "avr-objcopy".into(),
            image_flags: split_flags("-O ihex -R .eeprom"),
            size_tool: "avr-size".into(),
        }
    }
}

impl ToolchainProfile {
    /// Resolve a tool name against `tool_dir`.
    pub fn tool(&self, name: &str) -> String {
        match self.tool_dir {
            Some(ref dir) => dir.join(name).display().to_string(),
            None => name.to_string(),
        }
    }

    pub fn c_command(&self) -> String {
        self.tool(&self.c_compiler)
    }

    pub fn cpp_command(&self) -> String {
        self.tool(&self.cpp_compiler)
    }

    pub fn objcopy_command(&self) -> String {
        self.tool(&self.objcopy)
    }

    pub fn size_command(&self) -> String {
        self.tool(&self.size_tool)
    }
}

/// Parse a platform descriptor.
///
/// Recognised keys: `compiler.path`, `compiler.c.cmd`, `compiler.cpp.cmd`,
/// `compiler.c.flags`, `compiler.cpp.flags`, `compiler.S.flags`,
/// `compiler.c.elf.flags`, `compiler.objcopy.cmd`, `compiler.elf2hex.flags`,
/// `compiler.size.cmd`. Unknown keys are ignored. A command key with an empty
/// value keeps its default; a flag key with an empty value means "no flags".
///
/// Values may refer to other entries as `{key}`. A recognised key whose
/// value still refers to an undefined entry after expansion (such as the
/// IDE-provided `{runtime.tools.avr-gcc.path}`) keeps its default.
pub fn parse_toolchain(text: &str) -> Resolved<ToolchainProfile> {
    let mut profile = ToolchainProfile::default();
    let mut diagnostics = Vec::new();
    let all: Vec<_> = entries(text).collect();
    let vars: HashMap<&str, &str> = all.iter().map(|e| (e.key, e.value)).collect();

    for entry in &all {
        if !is_recognised(entry.key) {
            continue;
        }
        let value = expand(entry.value, &vars);
        if let Some(missing) = unresolved(&value) {
            diagnostics.push(Diagnostic::warning(format!(
                "line {}: '{}' refers to undefined {{{missing}}}; keeping default",
                entry.line, entry.key
            )));
            continue;
        }
        let value = value.as_str();

        let command_slot = match entry.key {
            "compiler.c.cmd" => Some(&mut profile.c_compiler),
            "compiler.cpp.cmd" => Some(&mut profile.cpp_compiler),
            "compiler.objcopy.cmd" => Some(&mut profile.objcopy),
            "compiler.size.cmd" => Some(&mut profile.size_tool),
            _ => None,
        };
        if let Some(slot) = command_slot {
            if value.is_empty() {
                diagnostics.push(Diagnostic::warning(format!(
                    "line {}: '{}' is empty; keeping default '{}'",
                    entry.line, entry.key, slot
                )));
            } else {
                *slot = value.to_string();
            }
            continue;
        }

        match entry.key {
            "compiler.path" if !value.is_empty() => {
                profile.tool_dir = Some(PathBuf::from(value));
            }
            "compiler.c.flags" => profile.c_flags = split_flags(value),
            "compiler.cpp.flags" => profile.cpp_flags = split_flags(value),
            "compiler.S.flags" => profile.asm_flags = split_flags(value),
            "compiler.c.elf.flags" => profile.link_flags = split_flags(value),
            "compiler.elf2hex.flags" => profile.image_flags = split_flags(value),
            _ => {}
        }
    }

    for d in &diagnostics {
        tracing::warn!("{}", d.message);
    }
    Resolved {
        profile,
        diagnostics,
    }
}

fn is_recognised(key: &str) -> bool {
    matches!(
        key,
        "compiler.path"
            | "compiler.c.cmd"
            | "compiler.cpp.cmd"
            | "compiler.objcopy.cmd"
            | "compiler.size.cmd"
            | "compiler.c.flags"
            | "compiler.cpp.flags"
            | "compiler.S.flags"
            | "compiler.c.elf.flags"
            | "compiler.elf2hex.flags"
    )
}

/// Load and parse a platform descriptor.
///
/// Never fails: a missing or unreadable file yields the built-in default
/// profile with a diagnostic explaining why.
pub fn load_toolchain(path: Option<&Path>) -> Resolved<ToolchainProfile> {
    let Some(path) = path else {
        return Resolved {
            profile: ToolchainProfile::default(),
            diagnostics: vec![Diagnostic::info(
                "no platform descriptor configured; using built-in toolchain defaults",
            )],
        };
    };

    match read_descriptor(path) {
        Ok(text) => parse_toolchain(&text),
        Err(e) => {
            tracing::warn!("{e}; using built-in toolchain defaults");
            Resolved {
                profile: ToolchainProfile::default(),
                diagnostics: vec![Diagnostic::warning(format!(
                    "{e}; using built-in toolchain defaults"
                ))],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_descriptor_yields_complete_defaults() {
        let resolved = parse_toolchain("");
        assert_eq!(resolved.profile, ToolchainProfile::default());
        assert!(resolved.diagnostics.is_empty());
        let p = resolved.profile;
        assert!(!p.c_compiler.is_empty());
        assert!(!p.cpp_compiler.is_empty());
        assert!(!p.objcopy.is_empty());
        assert!(!p.image_flags.is_empty());
    }

    #[test]
    fn corrupt_descriptor_yields_defaults() {
        let resolved = parse_toolchain("\u{0}\u{1}garbage\n[[[ not = ]]] \n===\n");
        assert_eq!(resolved.profile.c_compiler, "avr-gcc");
        assert_eq!(resolved.profile.objcopy, "avr-objcopy");
    }

    #[test]
    fn keys_override_field_by_field() {
        let text = "\
# platform
compiler.path=/opt/avr/bin
compiler.cpp.cmd=avr-g++-12
compiler.c.elf.flags=-Os -Wl,--gc-sections
compiler.unknown.key=ignored
";
        let p = parse_toolchain(text).profile;
        assert_eq!(p.cpp_compiler, "avr-g++-12");
        assert_eq!(p.c_compiler, "avr-gcc");
        assert_eq!(p.link_flags, ["-Os", "-Wl,--gc-sections"]);
        assert_eq!(p.cpp_command(), "/opt/avr/bin/avr-g++-12");
        assert_eq!(p.image_flags, ToolchainProfile::default().image_flags);
    }

    #[test]
    fn references_expand_before_use() {
        let text = "\
name=Arduino AVR Boards
compiler.warning_flags=-w
compiler.warning_flags.all=-Wall -Wextra
compiler.path={runtime.tools.avr-gcc.path}/bin/
compiler.c.cmd=avr-gcc
compiler.c.flags=-c -g -Os {compiler.warning_flags} -std=gnu11 -ffunction-sections -MMD
compiler.c.elf.flags={compiler.warning_flags} -Os -g -flto -Wl,--gc-sections
compiler.cpp.flags=-c -g -Os {compiler.warning_flags} {compiler.cpp.extra_flags} -std=gnu++11
compiler.cpp.extra_flags=
compiler.elf2hex.flags=-O ihex -R .eeprom
";
        let resolved = parse_toolchain(text);
        let p = &resolved.profile;
        assert_eq!(
            p.c_flags,
            ["-c", "-g", "-Os", "-w", "-std=gnu11", "-ffunction-sections", "-MMD"]
        );
        assert_eq!(p.link_flags[0], "-w");
        assert_eq!(p.cpp_flags, ["-c", "-g", "-Os", "-w", "-std=gnu++11"]);
        let mut every_flag = p.c_flags.iter().chain(&p.cpp_flags).chain(&p.link_flags);
        assert!(every_flag.all(|f| !f.contains('{')));

        assert!(p.tool_dir.is_none());
        assert_eq!(p.c_command(), "avr-gcc");
        assert_eq!(resolved.diagnostics.len(), 1);
        assert!(resolved.diagnostics[0].message.contains("line 4"));
        assert!(resolved.diagnostics[0]
            .message
            .contains("{runtime.tools.avr-gcc.path}"));
    }

    #[test]
    fn empty_command_keeps_default_with_warning() {
        let resolved = parse_toolchain("compiler.c.cmd=\n");
        assert_eq!(resolved.profile.c_compiler, "avr-gcc");
        assert!(resolved.has_warnings());
    }

    #[test]
    fn empty_flags_mean_no_flags() {
        let p = parse_toolchain("compiler.c.flags=\n").profile;
        assert!(p.c_flags.is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let resolved = load_toolchain(Some(Path::new("/nonexistent/platform.txt")));
        assert_eq!(resolved.profile, ToolchainProfile::default());
        assert!(resolved.has_warnings());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.txt");
        std::fs::write(&path, "compiler.size.cmd=avr-size-2\n").unwrap();
        let resolved = load_toolchain(Some(&path));
        assert_eq!(resolved.profile.size_tool, "avr-size-2");
        assert!(!resolved.has_warnings());
    }
}
