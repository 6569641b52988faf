use super::{
    utils::{write_repeated_byte, CMD_BYTE, DEFAULT_INSTRUMENT_BYTE, DEFAULT_WAVE_BYTE, EOF_BYTE, RLE_BYTE},
    BLOCK_COUNT, BLOCK_LEN,
};
use crate::{
    error::Error,
    song::{instrument::DEFAULT_INSTRUMENT, wave::DEFAULT_WAVE, SongMemory},
};
use std::io::{self, Seek, SeekFrom, Write};

/// Compress a song image into the block region, starting at a given block
///
/// The writer should be positioned at the start of block `start_block`
/// (0-based, as in the block-owner table). Jump markers are numbered from
/// `start_block`, so the output decompresses against the same anchor the
/// block region uses. Returns the number of blocks consumed; the final block
/// is zero-padded to its 512-byte boundary.
///
/// If the stream would spill past the last block, the writer is rolled back
/// to its initial position, the attempted region is zero-filled, and
/// [`Error::Capacity`] is returned.
pub fn compress<W>(
    song: &[u8; SongMemory::LEN],
    mut writer: W,
    start_block: u8,
) -> Result<u8, Error>
where
    W: Write + Seek,
{
    if start_block as usize >= BLOCK_COUNT {
        return Err(Error::Capacity);
    }

    let write_start = writer.stream_position()?;

    // Blocks are numbered from 1 in jump markers; the owner table is 0-based
    let mut block = start_block as u16 + 1;
    let mut block_size = 0;

    let mut position = 0;
    while position < song.len() {
        let (event, consumed) = next_event(song, position);
        position += consumed;

        // Each block keeps two bytes of headroom for its continuation marker
        if block_size + event.len() + 2 >= BLOCK_LEN {
            writer.write_all(&[CMD_BYTE, (block + 1) as u8])?;
            write_repeated_byte(0, BLOCK_LEN - block_size - 2, &mut writer)?;

            block += 1;
            block_size = 0;

            if block as usize > BLOCK_COUNT {
                return roll_back(writer, write_start);
            }
        }

        event.write(&mut writer)?;
        block_size += event.len();
    }

    writer.write_all(&[CMD_BYTE, EOF_BYTE])?;
    write_repeated_byte(0, BLOCK_LEN - block_size - 2, &mut writer)?;

    Ok((block - start_block as u16) as u8)
}

/// Undo a partial compression so the block region reads as untouched
fn roll_back<W>(mut writer: W, write_start: u64) -> Result<u8, Error>
where
    W: Write + Seek,
{
    let write_end = writer.stream_position()?;

    writer.seek(SeekFrom::Start(write_start))?;
    write_repeated_byte(0, (write_end - write_start) as usize, &mut writer)?;
    writer.seek(SeekFrom::Start(write_start))?;

    Err(Error::Capacity)
}

/// Detect the next compression event at `position`
///
/// Detectors are tried in priority order: default wave runs, default
/// instrument runs, marker-byte escapes, byte runs of four or more, and
/// finally a plain literal. Returns the event and the number of source bytes
/// it consumes.
fn next_event(song: &[u8], position: usize) -> (Event, usize) {
    if let count @ 1.. = count_matches(song, position, &DEFAULT_WAVE) {
        return (Event::DefaultWave { count }, count as usize * DEFAULT_WAVE.len());
    }

    if let count @ 1.. = count_matches(song, position, &DEFAULT_INSTRUMENT) {
        return (
            Event::DefaultInstrument { count },
            count as usize * DEFAULT_INSTRUMENT.len(),
        );
    }

    match song[position] {
        RLE_BYTE => (Event::RleLiteral, 1),
        CMD_BYTE => (Event::CmdLiteral, 1),
        value => {
            if song[position..].len() >= 4 && song[position..position + 4].iter().all(|b| *b == value) {
                let count = song[position..]
                    .iter()
                    .take(u8::MAX as usize)
                    .take_while(|b| **b == value)
                    .count();

                (Event::Run { value, count: count as u8 }, count)
            } else {
                (Event::Literal { value }, 1)
            }
        }
    }
}

/// How often a 16-byte constant repeats back-to-back at `position` (max 255)
fn count_matches(song: &[u8], mut position: usize, pattern: &[u8; 16]) -> u8 {
    let mut count = 0;
    while count < u8::MAX
        && song.len() - position >= pattern.len()
        && song[position..position + pattern.len()] == pattern[..]
    {
        count += 1;
        position += pattern.len();
    }

    count
}

#[derive(Debug, PartialEq, Eq)]
enum Event {
    DefaultWave { count: u8 },
    DefaultInstrument { count: u8 },
    RleLiteral,
    CmdLiteral,
    Run { value: u8, count: u8 },
    Literal { value: u8 },
}

impl Event {
    fn len(&self) -> usize {
        match self {
            Self::DefaultWave { .. } | Self::DefaultInstrument { .. } | Self::Run { .. } => 3,
            Self::RleLiteral | Self::CmdLiteral => 2,
            Self::Literal { .. } => 1,
        }
    }

    fn write<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        match self {
            Self::DefaultWave { count } => {
                writer.write_all(&[CMD_BYTE, DEFAULT_WAVE_BYTE, *count])
            }
            Self::DefaultInstrument { count } => {
                writer.write_all(&[CMD_BYTE, DEFAULT_INSTRUMENT_BYTE, *count])
            }
            Self::RleLiteral => writer.write_all(&[RLE_BYTE, RLE_BYTE]),
            Self::CmdLiteral => writer.write_all(&[CMD_BYTE, CMD_BYTE]),
            Self::Run { value, count } => writer.write_all(&[RLE_BYTE, *value, *count]),
            Self::Literal { value } => writer.write_all(&[*value]),
        }
    }
}
