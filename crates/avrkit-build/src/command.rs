//! Command lines for the cross toolchain.

use std::path::{Path, PathBuf};

use avrkit_core::Invocation;
use avrkit_descriptor::{BoardProfile, ToolchainProfile};

use crate::classify::ProjectKind;

/// Value of the `ARDUINO` define: the IDE version the core expects.
pub const ARDUINO_VERSION: u32 = 10819;

/// Translation-unit language, from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
    /// A sketch: C++ that does not carry a C++ extension.
    Sketch,
    Assembly,
}

impl Language {
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("c") => Language::C,
            Some("S") => Language::Assembly,
            Some("ino") => Language::Sketch,
            _ => Language::Cpp,
        }
    }
}

/// Everything needed to build command lines for one board and project kind.
#[derive(Debug, Clone)]
pub struct CommandSet<'a> {
    pub toolchain: &'a ToolchainProfile,
    pub board: &'a BoardProfile,
    pub kind: ProjectKind,
    pub include_dirs: Vec<PathBuf>,
}

impl<'a> CommandSet<'a> {
    pub fn new(
        toolchain: &'a ToolchainProfile,
        board: &'a BoardProfile,
        kind: ProjectKind,
    ) -> Self {
        Self {
            toolchain,
            board,
            kind,
            include_dirs: Vec::new(),
        }
    }

    pub fn include(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dirs.push(dir.into());
        self
    }

    fn mcu_flag(&self) -> String {
        format!("-mmcu={}", self.board.mcu)
    }

    /// Preprocessor defines. Framework builds get board and architecture
    /// defines on top of the clock.
    pub fn defines(&self) -> Vec<String> {
        let mut defines = vec![format!("-DF_CPU={}", self.board.f_cpu)];
        if self.kind == ProjectKind::Framework {
            defines.push(format!("-DARDUINO={ARDUINO_VERSION}"));
            defines.push(format!("-DARDUINO_{}", self.board.board_define));
            defines.push("-DARDUINO_ARCH_AVR".to_string());
        }
        defines
    }

    pub fn compile(&self, source: &Path, object: &Path) -> Invocation {
        let language = Language::of(source);
        let (program, flags) = match language {
            Language::C => (self.toolchain.c_command(), &self.toolchain.c_flags),
            Language::Assembly => (self.toolchain.c_command(), &self.toolchain.asm_flags),
            Language::Cpp | Language::Sketch => {
                (self.toolchain.cpp_command(), &self.toolchain.cpp_flags)
            }
        };
        let mut inv = Invocation::new(program).args(flags.iter().cloned());
        if language == Language::Sketch {
            inv = inv.args(["-x", "c++"]);
        }
        inv = inv.arg(self.mcu_flag()).args(self.defines());
        for dir in &self.include_dirs {
            inv = inv.arg(format!("-I{}", dir.display()));
        }
        inv.arg(source.display().to_string())
            .arg("-o")
            .arg(object.display().to_string())
    }

    /// Link objects and the math library into one executable.
    pub fn link(&self, objects: &[PathBuf], elf: &Path) -> Invocation {
        Invocation::new(self.toolchain.c_command())
            .args(self.toolchain.link_flags.iter().cloned())
            .arg(self.mcu_flag())
            .arg("-o")
            .arg(elf.display().to_string())
            .args(objects.iter().map(|o| o.display().to_string()))
            .arg("-lm")
    }

    pub fn extract_image(&self, elf: &Path, image: &Path) -> Invocation {
        Invocation::new(self.toolchain.objcopy_command())
            .args(self.toolchain.image_flags.iter().cloned())
            .arg(elf.display().to_string())
            .arg(image.display().to_string())
    }

    pub fn size(&self, elf: &Path) -> Invocation {
        Invocation::new(self.toolchain.size_command())
            .arg("--format=berkeley")
            .arg(elf.display().to_string())
    }
}

/// Object file for a source: `<out_dir>/<file name>.o`.
pub fn object_path(out_dir: &Path, source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unit".to_string());
    out_dir.join(format!("{name}.o"))
}
