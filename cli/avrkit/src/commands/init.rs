//! `avrkit init`: project scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use avrkit_core::layout::SRC_DIR;
use avrkit_core::ProjectKind;

use crate::manifest::{AvrkitManifest, MANIFEST_FILE};

/// Create a new project in `<cwd>/<name>`.
pub fn run(cwd: &Path, name: &str) -> Result<()> {
    create_project(&cwd.join(name), name)
}

pub(crate) fn create_project(project_dir: &Path, name: &str) -> Result<()> {
    if project_dir.exists() {
        bail!("directory '{}' already exists", project_dir.display());
    }

    let src = project_dir.join(SRC_DIR);
    fs::create_dir_all(&src).with_context(|| format!("creating {}", src.display()))?;
    fs::write(project_dir.join(MANIFEST_FILE), AvrkitManifest::template(name))
        .with_context(|| format!("writing {MANIFEST_FILE}"))?;
    let entry = avrkit_merge::project::entry_skeleton(ProjectKind::Framework);
    fs::write(src.join("main.cpp"), entry).context("writing src/main.cpp")?;
    fs::write(project_dir.join(".gitignore"), "build/\n").context("writing .gitignore")?;

    println!("Created project '{name}'");
    println!("  {name}/{MANIFEST_FILE}");
    println!("  {name}/src/main.cpp");
    println!("  {name}/.gitignore");
    println!("Run `avrkit generate` inside it to create the pin configuration files.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_project_structure() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), "blink").unwrap();

        let project = dir.path().join("blink");
        assert!(project.join(MANIFEST_FILE).is_file());
        assert!(project.join("src/main.cpp").is_file());
        assert!(project.join(".gitignore").is_file());

        let (manifest, found) = AvrkitManifest::find_and_load(&project.join("src"))
            .unwrap()
            .unwrap();
        assert_eq!(manifest.project.name, "blink");
        assert_eq!(found, project);
    }

    #[test]
    fn init_refuses_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("taken")).unwrap();
        let err = run(dir.path(), "taken").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
