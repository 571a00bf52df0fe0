//! Build configuration.

use std::path::{Path, PathBuf};

/// Inputs a build needs beyond the project root and board id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Project name; selects the `<name>.ino` entry candidate and names the
    /// produced artifacts.
    pub project_name: String,
    /// Root of the core/variant tree (`cores/arduino`, `variants/<variant>`).
    pub hardware_root: Option<PathBuf>,
    /// Platform descriptor; defaults to `<hardware_root>/platform.txt`.
    pub platform_descriptor: Option<PathBuf>,
    /// Board table; defaults to `<hardware_root>/boards.txt`.
    pub board_table: Option<PathBuf>,
    /// Output directory, relative to the project root.
    pub build_dir: PathBuf,
    /// Run the size tool after a successful build.
    pub report_size: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            project_name: "sketch".into(),
            hardware_root: None,
            platform_descriptor: None,
            board_table: None,
            build_dir: PathBuf::from("build"),
            report_size: true,
        }
    }
}

impl BuildOptions {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    pub fn with_hardware_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.hardware_root = Some(root.into());
        self
    }

    /// Explicit descriptor, else the hardware tree's, if it exists.
    pub fn resolved_platform_descriptor(&self) -> Option<PathBuf> {
        self.platform_descriptor
            .clone()
            .or_else(|| self.hardware_file("platform.txt"))
    }

    pub fn resolved_board_table(&self) -> Option<PathBuf> {
        self.board_table
            .clone()
            .or_else(|| self.hardware_file("boards.txt"))
    }

    fn hardware_file(&self, name: &str) -> Option<PathBuf> {
        let path = self.hardware_root.as_ref()?.join(name);
        path.is_file().then_some(path)
    }

    /// Framework core source directory.
    pub fn core_dir(&self) -> Option<PathBuf> {
        self.hardware_root
            .as_ref()
            .map(|root| root.join("cores").join("arduino"))
    }

    pub fn variant_dir(&self, variant: &str) -> Option<PathBuf> {
        self.hardware_root
            .as_ref()
            .map(|root| root.join("variants").join(variant))
    }

    pub fn output_dir(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.build_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_paths() {
        let opts = BuildOptions::new("blink").with_hardware_root("/hw");
        assert_eq!(opts.core_dir(), Some(PathBuf::from("/hw/cores/arduino")));
        assert_eq!(
            opts.variant_dir("standard"),
            Some(PathBuf::from("/hw/variants/standard"))
        );
        assert_eq!(opts.output_dir(Path::new("/p")), PathBuf::from("/p/build"));
    }

    #[test]
    fn descriptors_default_to_hardware_tree_when_present() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("boards.txt"), "").unwrap();
        let opts = BuildOptions::new("x").with_hardware_root(dir.path());
        assert_eq!(opts.resolved_board_table(), Some(dir.path().join("boards.txt")));
        assert_eq!(opts.resolved_platform_descriptor(), None);
    }
}
