use anyhow::{bail, Context, Result};
use clap::Args;
use savkit::{sav::Sav, u5};
use std::{env::current_dir, fs::File, path::PathBuf};

/// Export a project's song as a raw 32 KiB image
#[derive(Args)]
pub struct ExportArgs {
    /// The path to the save file to export from
    path: PathBuf,

    /// The index of the project that should be exported
    index: u8,

    /// The destination folder to place the image in
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub fn export(args: &ExportArgs) -> Result<()> {
    if args.index as usize >= savkit::sav::PROJECT_COUNT {
        bail!("{} is not a valid project index", args.index);
    }

    let sav = Sav::from_file(&args.path).context("Reading the save from file failed")?;

    let project = sav.project(u5::new(args.index));
    let Some(song) = project.song() else {
        bail!("Project {} is empty", args.index);
    };

    let folder = match &args.output {
        Some(folder) => folder.clone(),
        None => current_dir().context("Could not fetch current working directory")?,
    };

    let path = folder
        .join(format!("{:02}_{}", args.index, project.name.as_str()))
        .with_extension("raw");

    let file = File::create(&path).context("Could not create the output file")?;
    song.to_writer(file)
        .context("Writing the song image failed")?;

    println!("{:8} => {}", project.name.as_str(), path.to_string_lossy());

    Ok(())
}
