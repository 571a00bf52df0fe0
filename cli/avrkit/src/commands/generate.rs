//! `avrkit generate`: synthesize pin configuration code and merge it into
//! the project sources.

use anyhow::{Context, Result};
use avrkit_build::BuildError;
use avrkit_core::{ProjectKind, SourceLayout};
use avrkit_merge::MergeReport;

use crate::Project;

pub async fn run(project: &Project) -> Result<MergeReport> {
    let report = generate(project).await?;
    println!("{report}");
    Ok(report)
}

/// Runtime the generated code targets. A project without an entry file
/// yet gets a framework sketch.
async fn target_kind(layout: &SourceLayout) -> ProjectKind {
    match avrkit_build::classify(layout).await {
        Ok(classification) => classification.kind,
        Err(BuildError::NoEntry { .. }) => ProjectKind::Framework,
        Err(e) => {
            tracing::warn!(error = %e, "cannot classify project; generating framework code");
            ProjectKind::Framework
        }
    }
}

/// Synthesize and merge without printing.
pub async fn generate(project: &Project) -> Result<MergeReport> {
    let config = project.manifest.peripheral_config();
    let layout = SourceLayout::new(&project.dir, &project.manifest.project.name);
    let target = target_kind(&layout).await;
    let code = avrkit_synth::synthesize(&config, target)
        .with_context(|| format!("synthesizing {target} pin configuration"))?;
    let report = avrkit_merge::apply(&layout, &code)
        .await
        .context("merging generated code")?;
    tracing::info!(written = report.written(), "generated sources up to date");
    Ok(report)
}
