//! Fixed source layout of an avrkit project.

use std::path::{Path, PathBuf};

/// Source root, relative to the project root.
pub const SRC_DIR: &str = "src";

/// Generated declarations file, relative to the source root.
pub const HEADER_FILE: &str = "pins_config.h";

/// Generated implementation file, relative to the source root.
pub const IMPLEMENTATION_FILE: &str = "pins_config.cpp";

/// Paths of the files the pipeline reads and writes inside a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLayout {
    pub root: PathBuf,
    pub src_dir: PathBuf,
    pub header: PathBuf,
    pub implementation: PathBuf,
    /// Entry translation unit candidates, in priority order.
    pub entry_candidates: Vec<PathBuf>,
}

impl SourceLayout {
    pub fn new(root: impl Into<PathBuf>, project_name: &str) -> Self {
        let root = root.into();
        let src_dir = root.join(SRC_DIR);
        let entry_candidates = vec![
            src_dir.join("main.cpp"),
            src_dir.join("main.c"),
            src_dir.join(format!("{project_name}.ino")),
        ];
        Self {
            header: src_dir.join(HEADER_FILE),
            implementation: src_dir.join(IMPLEMENTATION_FILE),
            src_dir,
            root,
            entry_candidates,
        }
    }

    /// First existing entry candidate.
    pub fn find_entry(&self) -> Option<&Path> {
        self.entry_candidates
            .iter()
            .find(|p| p.is_file())
            .map(PathBuf::as_path)
    }

    /// Entry file used when the project has none yet.
    pub fn default_entry(&self) -> &Path {
        &self.entry_candidates[0]
    }

    /// Whether a path is one of the generated files.
    pub fn is_generated(&self, path: &Path) -> bool {
        path == self.header || path == self.implementation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_priority() {
        let dir = tempfile::tempdir().unwrap();
        let layout = SourceLayout::new(dir.path(), "blink");
        assert!(layout.find_entry().is_none());

        std::fs::create_dir_all(&layout.src_dir).unwrap();
        std::fs::write(layout.src_dir.join("blink.ino"), "").unwrap();
        assert_eq!(layout.find_entry(), Some(layout.src_dir.join("blink.ino").as_path()));

        std::fs::write(layout.src_dir.join("main.c"), "").unwrap();
        assert_eq!(layout.find_entry(), Some(layout.src_dir.join("main.c").as_path()));
    }

    #[test]
    fn generated_files() {
        let layout = SourceLayout::new("/p", "x");
        assert!(layout.is_generated(Path::new("/p/src/pins_config.h")));
        assert!(!layout.is_generated(Path::new("/p/src/main.cpp")));
        assert_eq!(layout.default_entry(), Path::new("/p/src/main.cpp"));
    }
}
