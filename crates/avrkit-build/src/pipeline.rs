//! Build pipeline orchestrator.

use std::path::{Path, PathBuf};

use avrkit_core::{CompilerDiagnostics, Invocation, SourceLayout, ToolOutput, ToolRunner};
use avrkit_descriptor::{
    load_board, load_toolchain, BoardProfile, DiagnosticSeverity, ToolchainProfile,
};

use crate::classify::{classify, ProjectKind};
use crate::command::{object_path, CommandSet};
use crate::error::{BuildError, Result};
use crate::options::BuildOptions;
use crate::result::{Artifacts, BuildLog, BuildStage, CompileResult, SkippedSource};
use crate::size::parse_size;

const CORE_EXTENSIONS: &[&str] = &["c", "cpp", "S"];

/// Runs builds through a [`ToolRunner`].
pub struct Builder<R: ToolRunner> {
    runner: R,
    options: BuildOptions,
}

impl<R: ToolRunner> Builder<R> {
    pub fn new(runner: R, options: BuildOptions) -> Self {
        Self { runner, options }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Build the project at `project_root` for `board_id`.
    ///
    /// Never fails: every fatal stage failure is reported in the returned
    /// result, with the stage it happened in.
    pub async fn build(&self, project_root: &Path, board_id: &str) -> CompileResult {
        let mut log = BuildLog::default();
        match self.run(project_root, board_id, &mut log).await {
            Ok(artifacts) => {
                tracing::info!(
                    board = board_id,
                    image = %artifacts.image.display(),
                    "build succeeded"
                );
                CompileResult::succeeded(board_id, artifacts, log)
            }
            Err(e) => {
                tracing::error!(board = board_id, stage = %e.stage(), "build failed: {e}");
                CompileResult::failed(board_id, &e, log)
            }
        }
    }

    async fn run(
        &self,
        project_root: &Path,
        board_id: &str,
        log: &mut BuildLog,
    ) -> Result<Artifacts> {
        let (toolchain, board) = self.resolve_profiles(board_id, log);
        let layout = SourceLayout::new(project_root, &self.options.project_name);
        let out_dir = self.options.output_dir(project_root);
        let core_out = out_dir.join("core");

        // Stage 1: classification
        let classification = classify(&layout).await?;
        log.kind = Some(classification.kind);

        tokio::fs::create_dir_all(&core_out)
            .await
            .map_err(|e| BuildError::io(&core_out, e))?;

        let mut commands =
            CommandSet::new(&toolchain, &board, classification.kind).include(&layout.src_dir);
        let mut core_dir = None;
        if classification.kind == ProjectKind::Framework {
            let dir = self.options.core_dir().ok_or(BuildError::NoHardwareRoot)?;
            if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                return Err(BuildError::CoreNotFound { path: dir });
            }
            commands = commands.include(&dir);
            if let Some(variant) = self.options.variant_dir(&board.variant) {
                commands = commands.include(variant);
            }
            core_dir = Some(dir);
        }

        // Stage 2: primary compilation, then the rest of the project
        let mut objects = Vec::new();
        objects.push(
            self.compile_fatal(&commands, &classification.entry, &out_dir, log)
                .await?,
        );
        for source in &classification.sources {
            objects.push(self.compile_fatal(&commands, source, &out_dir, log).await?);
        }

        // Stage 3: core sources, each failure skipped
        if let Some(dir) = core_dir {
            let sources = core_sources(&dir).await?;
            tracing::info!(count = sources.len(), "compiling core sources");
            for source in sources {
                if let Some(object) = self
                    .compile_tolerant(&commands, &source, &core_out, log)
                    .await?
                {
                    objects.push(object);
                }
            }
        }

        // Stage 4: link
        let elf = out_dir.join(format!("{}.elf", self.options.project_name));
        let output = self.invoke(BuildStage::Link, commands.link(&objects, &elf), log).await?;
        let diagnostics = self.record(&output, log);
        if diagnostics.is_fatal(&output) {
            return Err(BuildError::Link {
                message: diagnostics.summary(&output),
            });
        }

        // Stage 5: image extraction
        let image = out_dir.join(format!("{}.hex", self.options.project_name));
        let output = self
            .invoke(BuildStage::Image, commands.extract_image(&elf, &image), log)
            .await?;
        let diagnostics = self.record(&output, log);
        if diagnostics.is_fatal(&output) {
            return Err(BuildError::Image {
                message: diagnostics.summary(&output),
            });
        }
        if !tokio::fs::try_exists(&image).await.unwrap_or(false) {
            return Err(BuildError::Image {
                message: format!("{} was not produced", image.display()),
            });
        }

        // Stage 6: size report, never fatal
        let size = if self.options.report_size {
            self.size_report(&commands, &elf, log).await
        } else {
            None
        };

        Ok(Artifacts { elf, image, size })
    }

    fn resolve_profiles(
        &self,
        board_id: &str,
        log: &mut BuildLog,
    ) -> (ToolchainProfile, BoardProfile) {
        let platform = self.options.resolved_platform_descriptor();
        let toolchain = load_toolchain(platform.as_deref());
        let board_table = self.options.resolved_board_table();
        let board = load_board(board_id, board_table.as_deref());
        for diagnostic in toolchain.diagnostics.iter().chain(&board.diagnostics) {
            if diagnostic.severity == DiagnosticSeverity::Warning {
                log.warnings.push(diagnostic.message.clone());
            }
        }
        (toolchain.profile, board.profile)
    }

    async fn invoke(
        &self,
        stage: BuildStage,
        invocation: Invocation,
        log: &mut BuildLog,
    ) -> Result<ToolOutput> {
        tracing::debug!(%stage, command = %invocation, "running");
        let output = self
            .runner
            .run(&invocation)
            .await
            .map_err(|e| BuildError::tool(stage, e))?;
        log.capture(&output.stdout, &output.stderr);
        Ok(output)
    }

    fn record(&self, output: &ToolOutput, log: &mut BuildLog) -> CompilerDiagnostics {
        let diagnostics = CompilerDiagnostics::parse(&output.stderr);
        log.warnings.extend(diagnostics.warnings.iter().cloned());
        diagnostics
    }

    async fn compile_fatal(
        &self,
        commands: &CommandSet<'_>,
        source: &Path,
        out_dir: &Path,
        log: &mut BuildLog,
    ) -> Result<PathBuf> {
        let object = object_path(out_dir, source);
        let output = self
            .invoke(BuildStage::Compile, commands.compile(source, &object), log)
            .await?;
        let diagnostics = self.record(&output, log);
        if diagnostics.is_fatal(&output) {
            return Err(BuildError::Compile {
                stage: BuildStage::Compile,
                file: source.to_path_buf(),
                message: diagnostics.summary(&output),
            });
        }
        if !tokio::fs::try_exists(&object).await.unwrap_or(false) {
            return Err(BuildError::MissingObject { path: object });
        }
        Ok(object)
    }

    /// Compile one core source. A compile failure skips the file; only a
    /// missing compiler aborts the stage.
    async fn compile_tolerant(
        &self,
        commands: &CommandSet<'_>,
        source: &Path,
        out_dir: &Path,
        log: &mut BuildLog,
    ) -> Result<Option<PathBuf>> {
        let object = object_path(out_dir, source);
        let output = match self
            .invoke(BuildStage::Support, commands.compile(source, &object), log)
            .await
        {
            Ok(output) => output,
            Err(e @ BuildError::ToolMissing { .. }) => return Err(e),
            Err(e) => {
                self.skip(source, e.to_string(), log);
                return Ok(None);
            }
        };
        let diagnostics = self.record(&output, log);
        if diagnostics.is_fatal(&output) {
            self.skip(source, diagnostics.summary(&output), log);
            return Ok(None);
        }
        if !tokio::fs::try_exists(&object).await.unwrap_or(false) {
            self.skip(source, "no object file produced".to_string(), log);
            return Ok(None);
        }
        Ok(Some(object))
    }

    fn skip(&self, source: &Path, reason: String, log: &mut BuildLog) {
        tracing::warn!(source = %source.display(), "skipping core source: {reason}");
        log.warnings
            .push(format!("skipped core source {}: {reason}", source.display()));
        log.skipped.push(SkippedSource {
            path: source.to_path_buf(),
            reason,
        });
    }

    async fn size_report(
        &self,
        commands: &CommandSet<'_>,
        elf: &Path,
        log: &mut BuildLog,
    ) -> Option<crate::size::ImageSize> {
        let invocation = commands.size(elf);
        tracing::debug!(command = %invocation, "running size report");
        match self.runner.run(&invocation).await {
            Ok(output) if output.success => {
                let size = parse_size(&output.stdout);
                if size.is_none() {
                    log.warnings.push("size report output was not understood".into());
                }
                size
            }
            Ok(output) => {
                log.warnings.push(format!(
                    "size report failed: {}",
                    CompilerDiagnostics::parse(&output.stderr).summary(&output)
                ));
                None
            }
            Err(e) => {
                log.warnings.push(format!("size report unavailable: {e}"));
                None
            }
        }
    }
}

async fn core_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| BuildError::io(dir, e))?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| BuildError::io(dir, e))? {
        let path = entry.path();
        let is_source = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| CORE_EXTENSIONS.contains(&e));
        if is_source {
            sources.push(path);
        }
    }
    sources.sort();
    Ok(sources)
}

/// Remove the build output directory. Returns whether anything was removed.
pub async fn clean(project_root: &Path, options: &BuildOptions) -> Result<bool> {
    let dir = options.output_dir(project_root);
    match tokio::fs::remove_dir_all(&dir).await {
        Ok(()) => {
            tracing::info!(dir = %dir.display(), "removed build directory");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BuildError::io(dir, e)),
    }
}
