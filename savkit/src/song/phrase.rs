//! Phrases: 16 steps of notes, instrument references and commands

use super::{table::CommandColumn, STEP_COUNT};

/// The instrument reference marking a phrase step without one
pub const EMPTY_INSTRUMENT_REF: u8 = 0xFF;

/// One of the up to 255 phrases in a song
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phrase {
    /// Note numbers, zero for an empty step
    pub notes: [u8; STEP_COUNT],

    /// Instrument indices, [`EMPTY_INSTRUMENT_REF`] where no instrument is set
    pub instruments: [u8; STEP_COUNT],

    /// The command/value pair for each step
    pub commands: CommandColumn,
}

impl Default for Phrase {
    fn default() -> Self {
        Self {
            notes: [0; STEP_COUNT],
            instruments: [EMPTY_INSTRUMENT_REF; STEP_COUNT],
            commands: CommandColumn::default(),
        }
    }
}
