//! Instruments and their 16-byte payloads

use crate::name::{Name, NameFromBytesError};

/// The number of bytes an instrument takes up in a song image
pub const INSTRUMENT_BYTE_COUNT: usize = 16;

/// The number of bytes an instrument name takes up
pub const INSTRUMENT_NAME_LENGTH: usize = 5;

/// The payload written for unallocated instrument slots
///
/// This is also what a freshly allocated instrument starts out as, which makes
/// the sequence frequent enough in song images that the block codec has a
/// dedicated marker for it; see [`serde`](crate::serde).
pub const DEFAULT_INSTRUMENT: [u8; INSTRUMENT_BYTE_COUNT] = [
    0xA8, 0x00, 0x00, 0xFF, 0x00, 0x00, 0x03, 0x00, 0x00, 0xD0, 0x00, 0x00, 0x00, 0xF3, 0x00, 0x00,
];

/// The four flavors of instrument the tracker knows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Pulse,
    Wave,
    Kit,
    Noise,
}

/// One of the up to 64 instruments in a song
///
/// The parameter payload is kept as raw bytes; how the bytes are interpreted
/// depends on the instrument [`Kind`] (and, for some parameters, the format
/// version), which is a concern for editors rather than for this crate. The
/// name is stored separately in the image, over in bank 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub(crate) name: [u8; INSTRUMENT_NAME_LENGTH],
    pub(crate) bytes: [u8; INSTRUMENT_BYTE_COUNT],
}

impl Instrument {
    /// The instrument's kind, if the leading payload byte holds a known one
    pub fn kind(&self) -> Option<Kind> {
        match self.bytes[0] {
            0 => Some(Kind::Pulse),
            1 => Some(Kind::Wave),
            2 => Some(Kind::Kit),
            3 => Some(Kind::Noise),
            _ => None,
        }
    }

    /// The instrument's name
    ///
    /// Unused name memory can contain anything, so conversion may fail.
    pub fn name(&self) -> Result<Name<INSTRUMENT_NAME_LENGTH>, NameFromBytesError> {
        Name::from_bytes(&self.name)
    }

    /// Access the raw parameter payload
    pub fn as_bytes(&self) -> &[u8; INSTRUMENT_BYTE_COUNT] {
        &self.bytes
    }

    /// Access the raw parameter payload
    pub fn as_mut_bytes(&mut self) -> &mut [u8; INSTRUMENT_BYTE_COUNT] {
        &mut self.bytes
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: [0; INSTRUMENT_NAME_LENGTH],
            bytes: DEFAULT_INSTRUMENT,
        }
    }
}
