use super::{
    utils::{
        read_byte, write_repeated_byte, write_repeated_bytes, CMD_BYTE, DEFAULT_INSTRUMENT_BYTE,
        DEFAULT_WAVE_BYTE, EOF_BYTE, RLE_BYTE,
    },
    End, BLOCK_COUNT, BLOCK_LEN,
};
use crate::{
    error::Error,
    song::{instrument::DEFAULT_INSTRUMENT, wave::DEFAULT_WAVE, SongMemory},
};
use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    slice,
};

/// Decompress an entire song image from its block chain
///
/// The reader should be positioned at the first block of the chain; `anchor`
/// is the stream position of the block region's first block, used to resolve
/// in-band jump markers (jump value `v` targets `anchor + (v - 1) * 512`).
///
/// With `follow_jumps` disabled, a jump marker instead advances the reader to
/// the next 512-byte boundary past `anchor`. That mode serves streams whose
/// blocks were laid out in order regardless of their recorded jump values,
/// and dumping a chain block by block for diagnostics.
///
/// Exactly 32 KiB must come out; any other total is a format error.
pub fn decompress<R, W>(
    mut reader: R,
    mut writer: W,
    anchor: u64,
    follow_jumps: bool,
) -> Result<(), Error>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let write_start = writer.stream_position()?;

    loop {
        match decompress_block(&mut reader, &mut writer)? {
            End::EndOfFile => break,
            End::JumpToBlock(block) => {
                if !(1..=BLOCK_COUNT as u8).contains(&block) {
                    return Err(Error::format(format!("invalid block jump to {block:#04x}")));
                }

                let target = if follow_jumps {
                    anchor + (block as u64 - 1) * BLOCK_LEN as u64
                } else {
                    let offset = reader.stream_position()?.saturating_sub(anchor);
                    anchor + offset.div_ceil(BLOCK_LEN as u64) * BLOCK_LEN as u64
                };

                reader.seek(SeekFrom::Start(target))?;
            }
        }
    }

    let written = writer.stream_position()? - write_start;
    if written != SongMemory::LEN as u64 {
        return Err(Error::format("decompressed size mismatch"));
    }

    Ok(())
}

/// Decompress data from a block reader until a jump or end-of-stream marker
///
/// Returns [`End::JumpToBlock`] when a block-jump marker is read (the caller
/// decides how to reposition the reader) and [`End::EndOfFile`] when the
/// stream ends.
pub fn decompress_block<R, W>(mut reader: R, mut writer: W) -> io::Result<End>
where
    R: Read,
    W: Write,
{
    loop {
        let byte = read_byte(&mut reader)?;

        // Run-length section: either an escaped 0xC0 or a (value, count) pair
        if byte == RLE_BYTE {
            let value = read_byte(&mut reader)?;
            if value == RLE_BYTE {
                writer.write_all(&[RLE_BYTE])?;
            } else {
                let count = read_byte(&mut reader)? as usize;
                write_repeated_byte(value, count, &mut writer)?;
            }
            continue;
        }

        if byte != CMD_BYTE {
            writer.write_all(slice::from_ref(&byte))?;
            continue;
        }

        // Special action: the second byte selects what happens
        match read_byte(&mut reader)? {
            CMD_BYTE => writer.write_all(&[CMD_BYTE])?,
            DEFAULT_WAVE_BYTE => {
                let count = read_byte(&mut reader)? as usize;
                write_repeated_bytes(&DEFAULT_WAVE, count, &mut writer)?;
            }
            DEFAULT_INSTRUMENT_BYTE => {
                let count = read_byte(&mut reader)? as usize;
                write_repeated_bytes(&DEFAULT_INSTRUMENT, count, &mut writer)?;
            }
            EOF_BYTE => return Ok(End::EndOfFile),
            block => return Ok(End::JumpToBlock(block)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Run one block's worth of stream and collect what comes out
    fn decode(stream: &[u8]) -> (Vec<u8>, End) {
        let mut plain = Cursor::new(Vec::new());
        let end = decompress_block(Cursor::new(stream), &mut plain).expect("decoding failed");
        (plain.into_inner(), end)
    }

    #[test]
    fn literals_pass_through() {
        let (plain, end) = decode(&[0x01, 0x7F, 0x9A, CMD_BYTE, EOF_BYTE]);
        assert_eq!(plain, [0x01, 0x7F, 0x9A]);
        assert_eq!(end, End::EndOfFile);
    }

    #[test]
    fn rle_expands_runs() {
        let (plain, _) = decode(&[RLE_BYTE, 0x42, 5, CMD_BYTE, EOF_BYTE]);
        assert_eq!(plain, [0x42; 5]);

        // A zero count expands to nothing
        let (plain, _) = decode(&[RLE_BYTE, 0x42, 0, CMD_BYTE, EOF_BYTE]);
        assert!(plain.is_empty());
    }

    #[test]
    fn escaped_marker_bytes() {
        let (plain, _) = decode(&[
            RLE_BYTE, RLE_BYTE, CMD_BYTE, CMD_BYTE, RLE_BYTE, RLE_BYTE, CMD_BYTE, EOF_BYTE,
        ]);
        assert_eq!(plain, [RLE_BYTE, CMD_BYTE, RLE_BYTE]);
    }

    #[test]
    fn default_wave_stamps() {
        let (plain, _) = decode(&[CMD_BYTE, DEFAULT_WAVE_BYTE, 3, CMD_BYTE, EOF_BYTE]);
        assert_eq!(plain.len(), 3 * DEFAULT_WAVE.len());
        assert!(plain.chunks(DEFAULT_WAVE.len()).all(|chunk| chunk == DEFAULT_WAVE));
    }

    #[test]
    fn default_instrument_stamps() {
        let (plain, _) = decode(&[CMD_BYTE, DEFAULT_INSTRUMENT_BYTE, 1, CMD_BYTE, EOF_BYTE]);
        assert_eq!(plain, DEFAULT_INSTRUMENT);
    }

    #[test]
    fn block_jump_ends_the_block() {
        // Whatever follows the jump marker belongs to another block
        let (plain, end) = decode(&[0x0A, CMD_BYTE, 0x09, 0x55, 0x55]);
        assert_eq!(plain, [0x0A]);
        assert_eq!(end, End::JumpToBlock(9));
    }

    #[test]
    fn eof_ends_the_stream() {
        let (plain, end) = decode(&[CMD_BYTE, EOF_BYTE, 0x55]);
        assert!(plain.is_empty());
        assert_eq!(end, End::EndOfFile);
    }

    #[test]
    fn follows_jumps_through_the_block_region() {
        // Two blocks: the first expands 255 zeros and jumps to block 2, which
        // expands the rest of an all-zero song and ends the stream.
        let mut blocks = vec![0_u8; BLOCK_LEN * 2];
        blocks[..5].copy_from_slice(&[RLE_BYTE, 0x00, 0xFF, CMD_BYTE, 2]);

        let mut second = Vec::new();
        let mut left = SongMemory::LEN - 255;
        while left > 0 {
            let count = left.min(255);
            second.extend([RLE_BYTE, 0x00, count as u8]);
            left -= count;
        }
        second.extend([CMD_BYTE, EOF_BYTE]);
        assert!(second.len() <= BLOCK_LEN);
        blocks[BLOCK_LEN..BLOCK_LEN + second.len()].copy_from_slice(&second);

        let mut memory = [0xAA_u8; SongMemory::LEN];
        decompress(
            Cursor::new(&blocks),
            Cursor::new(memory.as_mut_slice()),
            0,
            true,
        )
        .expect("decompression failed");

        assert!(memory.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn ignores_jump_values_when_not_following() {
        // The jump points at block 0x50, but in sequential mode the reader
        // simply moves on to the next block boundary.
        let mut blocks = vec![0_u8; BLOCK_LEN * 2];
        blocks[..5].copy_from_slice(&[RLE_BYTE, 0x00, 0xFF, CMD_BYTE, 0x50]);

        let mut second = Vec::new();
        let mut left = SongMemory::LEN - 255;
        while left > 0 {
            let count = left.min(255);
            second.extend([RLE_BYTE, 0x00, count as u8]);
            left -= count;
        }
        second.extend([CMD_BYTE, EOF_BYTE]);
        blocks[BLOCK_LEN..BLOCK_LEN + second.len()].copy_from_slice(&second);

        let mut memory = [0xAA_u8; SongMemory::LEN];
        decompress(
            Cursor::new(&blocks),
            Cursor::new(memory.as_mut_slice()),
            0,
            false,
        )
        .expect("decompression failed");

        assert!(memory.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn size_mismatch() {
        let stream = [RLE_BYTE, 0x00, 0xFF, CMD_BYTE, EOF_BYTE];

        let mut memory = [0_u8; SongMemory::LEN];
        let result = decompress(
            Cursor::new(&stream),
            Cursor::new(memory.as_mut_slice()),
            0,
            true,
        );

        assert!(matches!(result, Err(Error::Format(_))));
    }
}
