use anyhow::{bail, Context, Result};
use clap::Args;
use savkit::{name::Name, sav::Sav, song::Song, u5};
use std::{
    fs::File,
    path::{Path, PathBuf},
};

/// Import raw song images into a fresh save file
#[derive(Args)]
pub struct ImportArgs {
    /// Paths to the song images that should be imported
    song: Vec<PathBuf>,

    /// The output path
    #[arg(short, long)]
    output: PathBuf,
}

pub fn import(args: ImportArgs) -> Result<()> {
    if args.song.len() > savkit::sav::PROJECT_COUNT {
        bail!("A save can hold at most {} songs", savkit::sav::PROJECT_COUNT);
    }

    let mut sav = Sav::new();

    for (index, path) in args.song.iter().enumerate() {
        let file = File::open(path).with_context(|| format!("Could not open {path:?}"))?;
        let song = Song::from_reader(file)
            .with_context(|| format!("Parsing the song image {path:?} failed"))?;

        let project = sav.project_mut(u5::new(index as u8));
        project.name = name_from_path(path);
        project.set_song(song);

        println!("{index:02} => {}", path.to_string_lossy());
    }

    sav.to_file(&args.output)
        .context("Writing the save failed")?;

    println!("Wrote {}", args.output.to_string_lossy());

    Ok(())
}

/// Derive a project name from a file stem, keeping the characters the tracker
/// can display
fn name_from_path(path: &Path) -> Name<8> {
    let stem = path
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_uppercase();

    let bytes: Vec<u8> = stem
        .bytes()
        .filter(|byte| Name::<8>::is_byte_allowed(*byte))
        .take(8)
        .collect();

    Name::from_bytes(&bytes).unwrap_or_default()
}
