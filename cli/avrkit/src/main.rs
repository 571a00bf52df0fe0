//! avrkit CLI: generate, build, flash and monitor AVR firmware projects.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use manifest::AvrkitManifest;

#[derive(Parser)]
#[command(name = "avrkit", version, about = "AVR firmware pipeline")]
struct Cli {
    /// Log debug output (overrides AVRKIT_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new avrkit project
    Init {
        /// Project name
        name: String,
    },
    /// Regenerate pin configuration code from avrkit.toml
    Generate,
    /// Generate, then compile and link a flashable image
    Build {
        /// Board id (default: [project] board)
        #[arg(long)]
        board: Option<String>,
        /// Print the build result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build (unless --image is given) and flash the board
    Upload {
        #[arg(long)]
        board: Option<String>,
        /// Serial device (default: [project] port)
        #[arg(long)]
        port: Option<PathBuf>,
        /// Flash this image instead of building
        #[arg(long)]
        image: Option<PathBuf>,
        /// Keep a telemetry reader on the port before and after flashing
        #[arg(long)]
        monitor: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print lines received from the board until interrupted
    Monitor {
        #[arg(long)]
        port: Option<PathBuf>,
        #[arg(long)]
        baud: Option<u32>,
    },
    /// List known boards, or show one resolved board profile
    Boards {
        /// Board id to show
        id: Option<String>,
    },
    /// List serial devices present on this host
    Ports,
    /// Remove build artifacts
    Clean,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("AVRKIT_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name } => commands::init::run(&cwd, &name),

        Commands::Generate => {
            let project = load_project(&cwd)?;
            commands::generate::run(&project).await.map(|_| ())
        }

        Commands::Build { board, json } => {
            let project = load_project(&cwd)?;
            commands::build::run(&project, board.as_deref(), json)
                .await
                .map(|_| ())
        }

        Commands::Upload {
            board,
            port,
            image,
            monitor,
            json,
        } => {
            let project = load_project(&cwd)?;
            commands::upload::run(
                &project,
                commands::upload::UploadArgs {
                    board,
                    port,
                    image,
                    monitor,
                    json,
                },
            )
            .await
        }

        Commands::Monitor { port, baud } => {
            let project = load_project(&cwd)?;
            commands::monitor::run(&project, port, baud).await
        }

        Commands::Boards { id } => {
            let project = load_manifest_optional(&cwd)?;
            commands::boards::run(project.as_ref(), id.as_deref())
        }

        Commands::Ports => commands::boards::ports(),

        Commands::Clean => {
            let project = load_project(&cwd)?;
            commands::clean::run(&project).await
        }
    }
}

/// A loaded manifest and the directory it was found in.
pub struct Project {
    pub dir: PathBuf,
    pub manifest: AvrkitManifest,
}

impl Project {
    pub fn build_options(&self) -> avrkit_build::BuildOptions {
        self.manifest
            .build_options(&self.dir, manifest::hardware_from_env())
    }
}

fn load_manifest_optional(cwd: &Path) -> anyhow::Result<Option<Project>> {
    Ok(AvrkitManifest::find_and_load(cwd)?.map(|(manifest, dir)| Project { dir, manifest }))
}

fn load_project(cwd: &Path) -> anyhow::Result<Project> {
    load_manifest_optional(cwd)?.ok_or_else(|| {
        anyhow::anyhow!(
            "no {} found in {} or any parent directory (run `avrkit init <name>`)",
            manifest::MANIFEST_FILE,
            cwd.display()
        )
    })
}
