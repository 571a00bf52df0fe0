//! `avrkit upload`: build (unless an image is given) and flash the board.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use avrkit_core::SystemRunner;
use avrkit_descriptor::{load_board, DiagnosticSeverity};
use avrkit_port::PortCoordinator;
use avrkit_upload::{AvrdudeProgrammer, UploadOptions, Uploader};

use crate::commands::{build, monitor};
use crate::Project;

pub struct UploadArgs {
    pub board: Option<String>,
    pub port: Option<PathBuf>,
    pub image: Option<PathBuf>,
    pub monitor: bool,
    pub json: bool,
}

pub async fn run(project: &Project, args: UploadArgs) -> Result<()> {
    let port = monitor::resolve_port(project, args.port)?;
    let board_id = args
        .board
        .unwrap_or_else(|| project.manifest.project.board.clone());

    let image = match args.image {
        Some(image) => image,
        None => {
            let result = build::build(project, Some(&board_id), !args.json).await?;
            if !args.json {
                build::report(&result);
            }
            if !result.success {
                bail!("build failed; nothing to upload");
            }
            result.image.context("build reported success without an image")?
        }
    };

    let options = project.build_options();
    let board = load_board(&board_id, options.resolved_board_table().as_deref());
    for diagnostic in &board.diagnostics {
        if diagnostic.severity == DiagnosticSeverity::Warning {
            tracing::warn!(board = %board_id, "{}", diagnostic.message);
        }
    }

    let coordinator = PortCoordinator::new();
    let telemetry = args.monitor.then(|| {
        let (reader, lines) = monitor::spawn(project, &coordinator, &port, None);
        (reader, monitor::forward(lines))
    });

    let mut programmer = AvrdudeProgrammer::new(SystemRunner);
    if let Some(ref conf) = project.manifest.toolchain.avrdude_config {
        programmer = programmer.with_config_file(project.dir.join(conf));
    }
    let mut upload_options = UploadOptions::default();
    if let Some(timeout) = project.manifest.upload_timeout() {
        upload_options.attempt_timeout = timeout;
    }
    let uploader = Uploader::new(programmer, coordinator, upload_options);
    let result = uploader.upload(&image, &port, &board.profile).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{result}");
        if !result.success && !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }
    }

    if let Some((reader, printer)) = telemetry {
        if result.success {
            eprintln!("Monitoring {} (Ctrl-C to stop)", port.display());
            monitor::interrupted().await?;
        }
        reader.stop().await;
        printer.await.context("monitor output task")?;
    }

    if !result.success {
        bail!("upload failed ({})", result.outcome);
    }
    Ok(())
}
