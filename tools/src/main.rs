mod export;
mod import;
mod inspect;

use anyhow::Result;
use clap::Parser;

/// Inspect and convert tracker save files
#[derive(Parser)]
#[command(author, version)]
enum Cli {
    Inspect(inspect::InspectArgs),
    Export(export::ExportArgs),
    Import(import::ImportArgs),
}

fn main() -> Result<()> {
    match Cli::parse() {
        Cli::Inspect(args) => inspect::inspect(&args),
        Cli::Export(args) => export::export(&args),
        Cli::Import(args) => import::import(args),
    }
}
