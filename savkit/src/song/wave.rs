//! Wavetable frames

/// The number of bytes in a single wavetable frame
pub const WAVE_LENGTH: usize = 16;

/// A single wavetable frame, two 4-bit samples per byte
pub type Wave = [u8; WAVE_LENGTH];

/// The wave frame every fresh song is filled with
///
/// Frames with this exact content are so common that the block codec has a
/// dedicated marker to stamp them out; see [`serde`](crate::serde).
pub const DEFAULT_WAVE: Wave = [
    0x8E, 0xCD, 0xCC, 0xBB, 0xAA, 0xA9, 0x99, 0x88, 0x87, 0x76, 0x66, 0x55, 0x54, 0x43, 0x32, 0x31,
];
