//! `avrkit.toml` manifest parsing and project configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use avrkit_build::BuildOptions;
use avrkit_synth::{Peripheral, PeripheralConfig};

pub const MANIFEST_FILE: &str = "avrkit.toml";

/// Environment variable overriding `[toolchain] hardware`.
pub const HARDWARE_ENV: &str = "AVRKIT_HARDWARE";

/// The top-level manifest structure for an avrkit project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvrkitManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Peripheral configuration consumed by code synthesis.
    #[serde(default)]
    pub peripherals: Vec<Peripheral>,
}

/// Project metadata section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProjectConfig {
    /// Project name (required). Names the `.ino` entry candidate and the
    /// build artifacts.
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Board id, resolved against the board table and presets.
    #[serde(default = "default_board")]
    pub board: String,
    /// Serial device used for upload and monitoring.
    #[serde(default)]
    pub port: Option<PathBuf>,
    /// Monitor line rate.
    #[serde(default)]
    pub monitor_baud: Option<u32>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_board() -> String {
    "uno".to_string()
}

/// Toolchain section. Relative paths are relative to the project directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolchainConfig {
    /// Root of the core/variant tree.
    #[serde(default)]
    pub hardware: Option<PathBuf>,
    /// Platform descriptor (defaults to `<hardware>/platform.txt`).
    #[serde(default)]
    pub platform: Option<PathBuf>,
    /// Board table (defaults to `<hardware>/boards.txt`).
    #[serde(default)]
    pub boards: Option<PathBuf>,
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    #[serde(default)]
    pub upload_timeout_secs: Option<u64>,
    /// `avrdude.conf` to pass to the programmer.
    #[serde(default)]
    pub avrdude_config: Option<PathBuf>,
}

impl AvrkitManifest {
    /// Search upward from `start_dir` for an `avrkit.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: AvrkitManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing avrkit.toml")
    }

    pub fn peripheral_config(&self) -> PeripheralConfig {
        PeripheralConfig {
            peripherals: self.peripherals.clone(),
        }
    }

    pub fn upload_timeout(&self) -> Option<Duration> {
        self.toolchain.upload_timeout_secs.map(Duration::from_secs)
    }

    /// Build options for a project rooted at `project_dir`. `hardware_env`
    /// is the value of [`HARDWARE_ENV`], which wins over the manifest.
    pub fn build_options(&self, project_dir: &Path, hardware_env: Option<PathBuf>) -> BuildOptions {
        let resolve = |p: &PathBuf| project_dir.join(p);
        let mut options = BuildOptions::new(&self.project.name);
        options.hardware_root =
            hardware_env.or_else(|| self.toolchain.hardware.as_ref().map(resolve));
        options.platform_descriptor = self.toolchain.platform.as_ref().map(resolve);
        options.board_table = self.toolchain.boards.as_ref().map(resolve);
        if let Some(ref dir) = self.toolchain.build_dir {
            options.build_dir = dir.clone();
        }
        options
    }

    /// Generate the default manifest for `avrkit init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"
version = "0.1.0"
board = "uno"

[toolchain]
# hardware = "/usr/share/arduino/hardware/arduino/avr"

[[peripherals]]
scope = "pin"
kind = "gpio"
pins = [{{ pin = "13", label = "LED_PIN", mode = "output", initial = "low" }}]
"#
        )
    }
}

/// `AVRKIT_HARDWARE`, if set and non-empty.
pub fn hardware_from_env() -> Option<PathBuf> {
    std::env::var_os(HARDWARE_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let toml_str = r#"
[project]
name = "thermostat"
version = "1.2.0"
board = "nano"
port = "/dev/ttyUSB0"
monitor-baud = 115200

[toolchain]
hardware = "vendor/avr"
boards = "boards.local.txt"
build-dir = "out"
upload-timeout-secs = 45

[[peripherals]]
scope = "pin"
kind = "uart"
baud = 115200
pins = [{ pin = "0", role = "rx" }, { pin = "1", role = "tx" }]

[[peripherals]]
scope = "global"
kind = "watchdog"
timeout-ms = 2000
"#;
        let manifest = AvrkitManifest::from_str(toml_str).unwrap();
        assert_eq!(manifest.project.name, "thermostat");
        assert_eq!(manifest.project.board, "nano");
        assert_eq!(manifest.project.port, Some(PathBuf::from("/dev/ttyUSB0")));
        assert_eq!(manifest.upload_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(manifest.peripherals.len(), 2);
        assert!(manifest.peripheral_config().validate().is_ok());

        let options = manifest.build_options(Path::new("/work/thermostat"), None);
        assert_eq!(options.project_name, "thermostat");
        assert_eq!(options.hardware_root, Some(PathBuf::from("/work/thermostat/vendor/avr")));
        assert_eq!(
            options.board_table,
            Some(PathBuf::from("/work/thermostat/boards.local.txt"))
        );
        assert_eq!(options.build_dir, PathBuf::from("out"));
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = AvrkitManifest::from_str("[project]\nname = \"minimal\"\n").unwrap();
        assert_eq!(manifest.project.version, "0.1.0");
        assert_eq!(manifest.project.board, "uno");
        assert!(manifest.project.port.is_none());
        assert!(manifest.peripherals.is_empty());
        let options = manifest.build_options(Path::new("/p"), None);
        assert!(options.hardware_root.is_none());
        assert_eq!(options.build_dir, PathBuf::from("build"));
    }

    #[test]
    fn environment_hardware_root_wins() {
        let manifest =
            AvrkitManifest::from_str("[project]\nname = \"x\"\n[toolchain]\nhardware = \"hw\"\n")
                .unwrap();
        let options = manifest.build_options(Path::new("/p"), Some(PathBuf::from("/opt/avr")));
        assert_eq!(options.hardware_root, Some(PathBuf::from("/opt/avr")));
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(AvrkitManifest::from_str("this is not valid toml [[[").is_err());
        assert!(AvrkitManifest::from_str("[project]\nversion = \"1\"\n").is_err());
    }

    #[test]
    fn template_is_valid() {
        let manifest = AvrkitManifest::from_str(&AvrkitManifest::template("blink")).unwrap();
        assert_eq!(manifest.project.name, "blink");
        assert_eq!(manifest.peripherals.len(), 1);
        assert!(manifest.peripheral_config().validate().is_ok());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[project]\nname = \"parent\"\n").unwrap();
        let nested = dir.path().join("src").join("lib");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found_dir) = AvrkitManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "parent");
        assert_eq!(found_dir, dir.path());
    }
}
