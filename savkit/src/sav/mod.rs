//! The save container: working song, header, project slots and block region
//!
//! A save is 128 KiB laid out as:
//!
//! | Offset   | Size    | Contents                                  |
//! |----------|---------|-------------------------------------------|
//! | `0x0000` | 32 KiB  | Working song, uncompressed                |
//! | `0x8000` | 321     | Header: names, versions, init marker      |
//! | `0x8141` | 191     | Block-owner table (`0xFF` = free)         |
//! | `0x8200` | 95.5 KiB| 191 compression blocks of 512 bytes       |
//!
//! The owner table records which project every block belongs to; only a
//! chain's *first* block matters for lookup, the rest are found by following
//! the in-band jump markers.

pub mod project;

use crate::{
    error::Error,
    name::Name,
    serde::{compress, decompress, BLOCK_COUNT, BLOCK_LEN},
    song::{Song, SongMemory},
};
use project::Project;
use std::{
    fs::File,
    io::{Cursor, Read, Seek, SeekFrom, Write},
    path::Path,
};
use ux::u5;

/// The number of project slots in a save
pub const PROJECT_COUNT: usize = 32;

const HEADER_OFFSET: u64 = SongMemory::LEN as u64;
const INIT_MARKER: [u8; 2] = [0x6A, 0x6B]; // "jk"
const NO_OWNER: u8 = 0xFF;

/// A full tracker save
///
/// One working song plus 32 project slots. Projects hold their songs
/// decompressed; the block packing only exists on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Sav {
    /// The song that's currently being worked on
    pub working_memory_song: Song,

    projects: [Project; PROJECT_COUNT],
    active_project: u8,
}

impl Sav {
    /// The length in bytes of an entire save
    pub const LEN: usize = 0x20000;

    /// Construct an empty save: no projects, a fresh working song
    pub fn new() -> Self {
        Self {
            working_memory_song: Song::new(),
            projects: Default::default(),
            active_project: 0,
        }
    }

    /// Deserialize a [`Sav`] from an arbitrary I/O reader
    pub fn from_reader<R>(mut reader: R) -> Result<Self, Error>
    where
        R: Read + Seek,
    {
        // Skip the working song for now; the header tells us what exists
        reader.seek(SeekFrom::Start(HEADER_OFFSET))?;

        let names: [u8; PROJECT_COUNT * 8] = read_array(&mut reader)?;
        let versions: [u8; PROJECT_COUNT] = read_array(&mut reader)?;
        let _empty: [u8; 30] = read_array(&mut reader)?;
        let init: [u8; 2] = read_array(&mut reader)?;
        if init != INIT_MARKER {
            return Err(Error::format("init marker check failed, not 'jk'"));
        }
        let [active_project]: [u8; 1] = read_array(&mut reader)?;

        let owner_table: [u8; BLOCK_COUNT] = read_array(&mut reader)?;
        let mut blocks = vec![0; BLOCK_COUNT * BLOCK_LEN];
        reader.read_exact(&mut blocks)?;

        let mut projects: [Project; PROJECT_COUNT] = Default::default();
        for (index, project) in projects.iter_mut().enumerate() {
            // A slot without blocks is empty; garbage in its name bytes is fine
            project.name = Name::from_bytes(&names[index * 8..(index + 1) * 8])
                .unwrap_or_default();
            project.version = versions[index];
        }

        for (index, owner) in owner_table.iter().copied().enumerate() {
            if owner == NO_OWNER {
                continue;
            }

            let project = projects
                .get_mut(owner as usize)
                .ok_or_else(|| Error::format(format!("block owner {owner} out of range")))?;

            // Later blocks of a chain are reached transitively; a project
            // that already has its song marks them as visited
            if project.has_song() {
                continue;
            }

            let mut block_reader = Cursor::new(blocks.as_slice());
            block_reader.seek(SeekFrom::Start((index * BLOCK_LEN) as u64))?;

            let mut memory = [0; SongMemory::LEN];
            decompress(
                block_reader,
                Cursor::new(memory.as_mut_slice()),
                0,
                true,
            )?;

            let memory = SongMemory::try_from(memory.as_slice())?;
            project.set_song(Song::from_memory(&memory)?);
        }

        reader.seek(SeekFrom::Start(0))?;
        let working_memory_song = Song::from_reader(&mut reader)?;

        Ok(Self {
            working_memory_song,
            projects,
            active_project,
        })
    }

    /// Deserialize a [`Sav`] from a file (.sav)
    pub fn from_file<P>(path: P) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        Self::from_reader(File::open(path)?)
    }

    /// Serialize the [`Sav`] to an arbitrary I/O writer
    ///
    /// Everything is staged in memory first; if a project's song doesn't fit
    /// in the remaining blocks, [`Error::Capacity`] is returned and nothing
    /// is written to the stream at all.
    pub fn to_writer<W>(&self, mut writer: W) -> Result<(), Error>
    where
        W: Write,
    {
        let (owner_table, blocks) = self.compose_blocks()?;

        let mut header = [0; 321];
        for (index, project) in self.projects.iter().enumerate() {
            header[index * 8..(index + 1) * 8].copy_from_slice(project.name.bytes());
            header[PROJECT_COUNT * 8 + index] = project.version;
        }
        header[0x13E..0x140].copy_from_slice(&INIT_MARKER);
        header[0x140] = self.active_project;

        self.working_memory_song.to_writer(&mut writer)?;
        writer.write_all(&header)?;
        writer.write_all(&owner_table)?;
        writer.write_all(&blocks)?;

        Ok(())
    }

    /// Serialize the [`Sav`] to a file (.sav)
    pub fn to_file<P>(&self, path: P) -> Result<(), Error>
    where
        P: AsRef<Path>,
    {
        self.to_writer(File::create(path)?)
    }

    /// Access one of the 32 project slots
    pub fn project(&self, index: u5) -> &Project {
        &self.projects[u8::from(index) as usize]
    }

    /// Access one of the 32 project slots mutably
    pub fn project_mut(&mut self, index: u5) -> &mut Project {
        &mut self.projects[u8::from(index) as usize]
    }

    /// Access all project slots
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Is a project slot in use (does it hold a song)?
    pub fn is_project_in_use(&self, index: u5) -> bool {
        self.project(index).has_song()
    }

    /// Empty a project slot
    pub fn clear_project(&mut self, index: u5) {
        self.project_mut(index).clear();
    }

    /// The slot the working song was loaded from, if any
    pub fn active_project(&self) -> Option<u5> {
        match self.active_project {
            index if (index as usize) < PROJECT_COUNT => Some(u5::new(index)),
            _ => None,
        }
    }

    /// Mark the slot the working song belongs to
    pub fn set_active_project(&mut self, index: u5) {
        self.active_project = index.into();
    }

    /// How many of the 191 blocks the projects would take up when written
    pub fn blocks_used_count(&self) -> Result<usize, Error> {
        let (owner_table, _) = self.compose_blocks()?;
        Ok(owner_table.iter().filter(|owner| **owner != NO_OWNER).count())
    }

    /// Compress every project into a block region, first-fit from block 0
    fn compose_blocks(&self) -> Result<([u8; BLOCK_COUNT], Vec<u8>), Error> {
        let mut owner_table = [NO_OWNER; BLOCK_COUNT];
        let mut blocks = vec![0; BLOCK_COUNT * BLOCK_LEN];

        let mut writer = Cursor::new(blocks.as_mut_slice());
        let mut current_block = 0_u8;

        for (index, project) in self.projects.iter().enumerate() {
            let Some(song) = project.song() else {
                continue;
            };

            let memory = song.to_memory()?;
            writer.seek(SeekFrom::Start(current_block as u64 * BLOCK_LEN as u64))?;
            let used = compress(memory.as_bytes(), &mut writer, current_block)?;

            owner_table[current_block as usize..(current_block + used) as usize]
                .fill(index as u8);
            current_block += used;
        }

        Ok((owner_table, blocks))
    }
}

impl Default for Sav {
    fn default() -> Self {
        Self::new()
    }
}

fn read_array<const N: usize, R>(mut reader: R) -> Result<[u8; N], Error>
where
    R: Read,
{
    let mut bytes = [0; N];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_to_vec(sav: &Sav) -> Vec<u8> {
        let mut bytes = Vec::new();
        sav.to_writer(&mut bytes).expect("serialization failed");
        assert_eq!(bytes.len(), Sav::LEN);
        bytes
    }

    /// Deterministic bytes with no runs, to keep the codec from compressing
    fn fill_with_noise(song: &mut Song, frames: usize) {
        let mut state = 1_u8;
        for wave in &mut song.waves[..frames] {
            for byte in wave.iter_mut() {
                state = state.wrapping_mul(73).wrapping_add(71);
                *byte = state;
            }
        }
    }

    #[test]
    fn empty_roundtrip() {
        let sav = Sav::new();
        let bytes = write_to_vec(&sav);

        // Init marker and an all-free owner table
        assert_eq!(&bytes[0x813E..0x8140], b"jk");
        assert!(bytes[0x8141..0x8200].iter().all(|owner| *owner == 0xFF));

        let read = Sav::from_reader(Cursor::new(&bytes)).expect("parsing failed");
        assert_eq!(read, sav);
        assert_eq!(read.blocks_used_count().unwrap(), 0);
    }

    #[test]
    fn first_fit_owner_table() {
        let mut big = Song::new();
        fill_with_noise(&mut big, 256);

        let mut small = Song::new();
        fill_with_noise(&mut small, 64);

        // Sizes of each song on its own
        let scratch = |song: &Song| {
            let mut region = vec![0; BLOCK_COUNT * BLOCK_LEN];
            compress(
                song.to_memory().unwrap().as_bytes(),
                Cursor::new(region.as_mut_slice()),
                0,
            )
            .unwrap() as usize
        };
        let big_blocks = scratch(&big);
        let small_blocks = scratch(&small);
        assert!(big_blocks > small_blocks);
        assert!(small_blocks > 0);

        let mut sav = Sav::new();
        sav.project_mut(u5::new(0)).name = "BIG".try_into().unwrap();
        sav.project_mut(u5::new(0)).set_song(big);
        sav.project_mut(u5::new(1)).name = "SMALL".try_into().unwrap();
        sav.project_mut(u5::new(1)).set_song(small);

        let bytes = write_to_vec(&sav);
        let owner_table = &bytes[0x8141..0x8200];

        // Project 0's blocks first, project 1's right after, the rest free
        assert!(owner_table[..big_blocks].iter().all(|owner| *owner == 0));
        assert!(owner_table[big_blocks..big_blocks + small_blocks]
            .iter()
            .all(|owner| *owner == 1));
        assert!(owner_table[big_blocks + small_blocks..]
            .iter()
            .all(|owner| *owner == 0xFF));

        assert_eq!(
            sav.blocks_used_count().unwrap(),
            big_blocks + small_blocks
        );

        let read = Sav::from_reader(Cursor::new(&bytes)).expect("parsing failed");
        assert_eq!(read, sav);
        assert_eq!(read.project(u5::new(0)).name.as_str(), "BIG");
        assert_eq!(read.project(u5::new(1)).name.as_str(), "SMALL");
        assert!(!read.is_project_in_use(u5::new(2)));
    }

    #[test]
    fn corrupt_init_marker() {
        let mut bytes = write_to_vec(&Sav::new());
        bytes[0x813E] = b'X';

        let error = Sav::from_reader(Cursor::new(&bytes)).unwrap_err();
        match error {
            Error::Format(message) => assert!(message.contains("init"), "{message}"),
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn owner_out_of_range() {
        let mut bytes = write_to_vec(&Sav::new());
        bytes[0x8141] = 32;

        assert!(matches!(
            Sav::from_reader(Cursor::new(&bytes)),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn garbage_name_bytes_in_empty_slots_are_ignored() {
        let mut bytes = write_to_vec(&Sav::new());
        bytes[0x8000 + 5 * 8] = 0x01; // slot 5's name, not a valid character

        let read = Sav::from_reader(Cursor::new(&bytes)).expect("parsing failed");
        assert!(read.project(u5::new(5)).name.is_empty());
    }

    #[test]
    fn active_project() {
        let mut sav = Sav::new();
        assert_eq!(sav.active_project(), Some(u5::new(0)));

        sav.set_active_project(u5::new(7));
        let bytes = write_to_vec(&sav);
        assert_eq!(bytes[0x8140], 7);

        let read = Sav::from_reader(Cursor::new(&bytes)).unwrap();
        assert_eq!(read.active_project(), Some(u5::new(7)));
    }

    #[test]
    fn project_versions_survive() {
        let mut sav = Sav::new();
        sav.project_mut(u5::new(3)).name = "VER".try_into().unwrap();
        sav.project_mut(u5::new(3)).version = 0x2A;
        sav.project_mut(u5::new(3)).set_song(Song::new());

        let bytes = write_to_vec(&sav);
        let read = Sav::from_reader(Cursor::new(&bytes)).unwrap();

        assert_eq!(read.project(u5::new(3)).version, 0x2A);
        assert!(read.is_project_in_use(u5::new(3)));
        assert_eq!(
            read.project(u5::new(3)).song(),
            Some(&Song::new())
        );
    }
}
