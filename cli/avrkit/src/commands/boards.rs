//! `avrkit boards` and `avrkit ports`.

use std::path::Path;

use anyhow::{Context, Result};
use avrkit_build::BuildOptions;
use avrkit_descriptor::{list_boards, load_board, parse_board, DiagnosticSeverity};

use crate::manifest::hardware_from_env;
use crate::Project;

pub fn run(project: Option<&Project>, id: Option<&str>) -> Result<()> {
    let options = match project {
        Some(project) => project.build_options(),
        None => BuildOptions {
            hardware_root: hardware_from_env(),
            ..BuildOptions::default()
        },
    };
    let table = options.resolved_board_table();
    match id {
        Some(id) => show(id, table.as_deref()),
        None => list(table.as_deref()),
    }
}

fn list(table: Option<&Path>) -> Result<()> {
    let text = match table {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => String::new(),
    };
    for id in list_boards(&text) {
        let board = parse_board(&id, &text).into_profile();
        println!("{:<12} {:<12} {}", board.id, board.mcu, board.name);
    }
    Ok(())
}

fn show(id: &str, table: Option<&Path>) -> Result<()> {
    let resolved = load_board(id, table);
    let board = &resolved.profile;
    println!("Board:    {} ({})", board.id, board.name);
    println!("MCU:      {}", board.mcu);
    println!("Clock:    {}", board.f_cpu);
    println!("Variant:  {}", board.variant);
    println!("Define:   ARDUINO_{}", board.board_define);
    println!("Upload:   {} at {} baud", board.upload.protocol, board.upload.speed);
    for diagnostic in &resolved.diagnostics {
        match diagnostic.severity {
            DiagnosticSeverity::Warning => eprintln!("warning: {}", diagnostic.message),
            DiagnosticSeverity::Info => eprintln!("note: {}", diagnostic.message),
        }
    }
    Ok(())
}

pub fn ports() -> Result<()> {
    let ports = avrkit_port::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port.display());
    }
    Ok(())
}
