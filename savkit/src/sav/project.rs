//! Project slots within a save

use crate::{name::Name, song::Song};

/// One of the 32 project slots in a [`Sav`](super::Sav)
///
/// A slot always has name and version bytes in the save header, but it only
/// counts as in use while it holds a song. The song is kept decompressed;
/// packing it into blocks happens when the save is written.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Project {
    /// The name shown in the tracker's project list
    pub name: Name<8>,

    /// A version counter the tracker bumps on every save
    pub version: u8,

    song: Option<Box<Song>>,
}

impl Project {
    /// Access the project's song, if it has one
    pub fn song(&self) -> Option<&Song> {
        self.song.as_deref()
    }

    /// Access the project's song mutably, if it has one
    pub fn song_mut(&mut self) -> Option<&mut Song> {
        self.song.as_deref_mut()
    }

    /// Put a song in the slot, replacing whatever was there
    pub fn set_song(&mut self, song: Song) {
        self.song = Some(Box::new(song));
    }

    /// Take the song out of the slot, leaving it empty
    pub fn take_song(&mut self) -> Option<Song> {
        self.song.take().map(|song| *song)
    }

    /// Does this slot hold a song?
    pub fn has_song(&self) -> bool {
        self.song.is_some()
    }

    /// Empty the slot: zero the name, reset the version, drop the song
    pub fn clear(&mut self) {
        self.name = Name::default();
        self.version = 0;
        self.song = None;
    }
}
