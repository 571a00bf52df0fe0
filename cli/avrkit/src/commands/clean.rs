//! `avrkit clean`: remove build artifacts.

use anyhow::Result;

use crate::Project;

pub async fn run(project: &Project) -> Result<()> {
    let options = project.build_options();
    let dir = options.output_dir(&project.dir);
    if avrkit_build::clean(&project.dir, &options).await? {
        println!("Removed {}", dir.display());
    } else {
        println!("Already clean: {} does not exist", dir.display());
    }
    Ok(())
}
