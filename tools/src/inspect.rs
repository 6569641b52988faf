use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use savkit::{sav::Sav, serde::BLOCK_COUNT};
use std::path::PathBuf;

/// List the projects stored in a save file
#[derive(Args)]
pub struct InspectArgs {
    /// The path to the save file to inspect
    path: PathBuf,
}

pub fn inspect(args: &InspectArgs) -> Result<()> {
    let sav = Sav::from_file(&args.path).context("Reading the save from file failed")?;

    let used = sav
        .blocks_used_count()
        .context("Sizing the block region failed")?;

    let gauge = format!("Mem {used}/{BLOCK_COUNT}");
    let gauge = if used * 4 > BLOCK_COUNT * 3 {
        gauge.red()
    } else {
        gauge.green()
    };

    println!(
        "{:<32}{gauge}",
        args.path.file_name().unwrap_or_default().to_string_lossy()
    );

    for (index, project) in sav.projects().iter().enumerate() {
        if let Some(song) = project.song() {
            println!(
                "{index:>3} | {:<8} | v{:03} | f{:03}",
                project.name.as_str(),
                project.version,
                song.format_version
            );
        }
    }

    Ok(())
}
