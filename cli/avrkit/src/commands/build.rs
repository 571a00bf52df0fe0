//! `avrkit build`: regenerate, then compile, link and extract the image.

use anyhow::{bail, Result};
use avrkit_build::{Builder, CompileResult};
use avrkit_core::SystemRunner;

use crate::commands::generate;
use crate::Project;

pub async fn run(project: &Project, board: Option<&str>, json: bool) -> Result<CompileResult> {
    let result = build(project, board, !json).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report(&result);
    }
    if !result.success {
        bail!("build failed");
    }
    Ok(result)
}

/// Generate and build without printing the result.
pub async fn build(
    project: &Project,
    board: Option<&str>,
    show_generate: bool,
) -> Result<CompileResult> {
    let merge = generate::generate(project).await?;
    if show_generate {
        println!("{merge}");
    }
    let board = board.unwrap_or(&project.manifest.project.board);
    let builder = Builder::new(SystemRunner, project.build_options());
    Ok(builder.build(&project.dir, board).await)
}

/// Human-readable result; compiler output goes to stderr on failure.
pub fn report(result: &CompileResult) {
    print!("{result}");
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    if !result.success && !result.stderr.is_empty() {
        eprint!("{}", result.stderr);
    }
}
