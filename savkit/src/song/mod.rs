//! Song images and everything they're made of
//!
//! A song occupies a fixed 32 KiB image, logically divided into four 8 KiB
//! banks. [`SongMemory`] is that image unparsed; [`Song`] is its parsed form:
//! rows, chains, phrases, instruments, tables, synths, waves, grooves and
//! speech words, with allocation tables deciding which of the variable-count
//! entities actually exist.

pub mod chain;
pub mod instrument;
pub mod phrase;
pub mod synth;
pub mod table;
pub mod wave;
pub mod word;

use crate::{
    error::Error,
    song::{
        chain::Chain,
        instrument::{Instrument, DEFAULT_INSTRUMENT, INSTRUMENT_NAME_LENGTH},
        phrase::Phrase,
        synth::{pack_overwrite_locks, unpack_overwrite_locks, Synth},
        table::Table,
        wave::{Wave, DEFAULT_WAVE},
        word::Word,
    },
};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

/// The number of rows in the song sequence
pub const ROW_COUNT: usize = 256;

/// The number of chain slots in a song
pub const CHAIN_COUNT: usize = 128;

/// The number of phrase slots in a song
pub const PHRASE_COUNT: usize = 255;

/// The number of instrument slots in a song
pub const INSTRUMENT_COUNT: usize = 64;

/// The number of table slots in a song
pub const TABLE_COUNT: usize = 32;

/// The number of soft synths in a song
pub const SYNTH_COUNT: usize = 16;

/// The number of wavetable frames in a song
pub const WAVE_COUNT: usize = 256;

/// The number of grooves in a song
pub const GROOVE_COUNT: usize = 32;

/// The number of speech synth words in a song
pub const WORD_COUNT: usize = 42;

/// The number of bytes a speech word's name takes up
pub const WORD_NAME_LENGTH: usize = 4;

/// The number of bookmark bytes in a song
pub const BOOKMARK_COUNT: usize = 64;

/// The number of steps in chains, phrases and tables
pub const STEP_COUNT: usize = 16;

// The two bytes the image carries at three fixed offsets for corruption checks
const CHECK_VALUE: [u8; 2] = [0x72, 0x62]; // "rb"
const CHECK_OFFSETS: [usize; 3] = [0x1E78, 0x3E80, 0x7FF0];

const FORMAT_VERSION_OFFSET: usize = 0x7FFF;
const TABLE_ALLOC_OFFSET: usize = 0x2020;
const INSTRUMENT_ALLOC_OFFSET: usize = 0x2040;
const PHRASE_ALLOC_OFFSET: usize = 0x3E82;
const CHAIN_ALLOC_OFFSET: usize = 0x3EA2;

/// A groove: sixteen per-step tick lengths
pub type Groove = [u8; STEP_COUNT];

/// A contiguous block of memory that represents unparsed song data
#[derive(Clone, Debug)]
pub struct SongMemory {
    /// The bytes that make up the song
    bytes: [u8; Self::LEN],
}

impl SongMemory {
    /// The number of bytes taken up by a single song
    pub const LEN: usize = 0x8000;

    /// Deserialize [`SongMemory`] from an arbitrary I/O reader
    pub fn from_reader<R>(mut reader: R) -> Result<Self, Error>
    where
        R: Read,
    {
        let mut bytes = [0; Self::LEN];
        reader.read_exact(bytes.as_mut_slice())?;

        check_markers(&bytes)?;

        Ok(Self { bytes })
    }

    /// Serialize [`SongMemory`] to an arbitrary I/O writer
    pub fn to_writer<W>(&self, mut writer: W) -> Result<(), Error>
    where
        W: Write,
    {
        writer.write_all(&self.bytes)?;
        Ok(())
    }

    /// The version of the format the song is encoded in
    pub fn format_version(&self) -> u8 {
        self.bytes[FORMAT_VERSION_OFFSET]
    }

    /// Access the bytes that make up the song
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    /// Access the bytes that make up the song
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub(crate) fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.bytes
    }
}

impl TryFrom<&[u8]> for SongMemory {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::LEN] = value
            .try_into()
            .map_err(|_| Error::format("song memory is not 32768 bytes"))?;

        check_markers(&bytes)?;

        Ok(Self { bytes })
    }
}

/// Verify the three "rb" markers an intact image carries
fn check_markers(bytes: &[u8; SongMemory::LEN]) -> Result<(), Error> {
    for offset in CHECK_OFFSETS {
        if bytes[offset..offset + 2] != CHECK_VALUE {
            return Err(Error::format(format!(
                "missing rb marker at 0x{offset:04X}"
            )));
        }
    }

    Ok(())
}

/// The playback row for every channel at one step of the song sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub pulse1: u8,
    pub pulse2: u8,
    pub wave: u8,
    pub noise: u8,
}

impl Row {
    /// A row referencing no chain on any channel
    pub const EMPTY: Self = Self {
        pulse1: 0xFF,
        pulse2: 0xFF,
        wave: 0xFF,
        noise: 0xFF,
    };

    fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            pulse1: bytes[0],
            pulse2: bytes[1],
            wave: bytes[2],
            noise: bytes[3],
        }
    }

    fn to_bytes(self) -> [u8; 4] {
        [self.pulse1, self.pulse2, self.wave, self.noise]
    }
}

impl Default for Row {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Times and settings stored alongside the musical data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub work_time: WorkTime,
    pub total_time: TotalTime,
    pub key_delay: u8,
    pub key_repeat: u8,
    pub font: u8,
    pub sync: u8,
    pub color_set: u8,
    pub clone: u8,
    pub file_changed: u8,
    pub power_save: u8,
    pub pre_listen: u8,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            work_time: WorkTime::default(),
            total_time: TotalTime::default(),
            key_delay: 7,
            key_repeat: 2,
            font: 0,
            sync: 0,
            color_set: 0,
            clone: 0,
            file_changed: 0,
            power_save: 0,
            pre_listen: 1,
        }
    }
}

/// How long the current session has been worked on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkTime {
    pub hours: u8,
    pub minutes: u8,
}

/// How long the song has been worked on in total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalTime {
    pub days: u8,
    pub hours: u8,
    pub minutes: u8,
}

/// A fully parsed song
///
/// Reading and writing are exact mirrors: a parsed image serializes back to
/// the same bytes, except that memory behind unallocated entities is replaced
/// by its canonical fill. Reserved regions are carried as opaque bytes so
/// images from format versions this crate doesn't fully understand survive a
/// round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub format_version: u8,
    pub tempo: u8,
    pub transposition: u8,

    /// The song sequence: which chain every channel plays at each step
    pub rows: [Row; ROW_COUNT],

    pub chains: [Option<Chain>; CHAIN_COUNT],
    pub phrases: [Option<Phrase>; PHRASE_COUNT],
    pub instruments: [Option<Instrument>; INSTRUMENT_COUNT],
    pub tables: [Option<Table>; TABLE_COUNT],

    pub synths: [Synth; SYNTH_COUNT],
    pub waves: [Wave; WAVE_COUNT],
    pub grooves: [Groove; GROOVE_COUNT],

    pub words: [Word; WORD_COUNT],
    pub word_names: [[u8; WORD_NAME_LENGTH]; WORD_COUNT],

    pub bookmarks: [u8; BOOKMARK_COUNT],
    pub meta: Meta,

    pub reserved_1030: [u8; 96],
    pub reserved_1fba: [u8; 70],
    pub reserved_2000: [u8; 32],
    pub reserved_3fb9: u8,
    pub reserved_3fbf: u8,
    pub reserved_3fc6: [u8; 58],
    pub reserved_5fe0: [u8; 32],
    pub reserved_7ff2: [u8; 13],
}

impl Song {
    /// Construct a new song the way the tracker initializes one
    pub fn new() -> Self {
        let mut groove = [0; STEP_COUNT];
        groove[0] = 6;
        groove[1] = 6;

        Self {
            format_version: 4,
            tempo: 128,
            transposition: 0,
            rows: [Row::EMPTY; ROW_COUNT],
            chains: [None; CHAIN_COUNT],
            phrases: [None; PHRASE_COUNT],
            instruments: [None; INSTRUMENT_COUNT],
            tables: [None; TABLE_COUNT],
            synths: [Synth::default(); SYNTH_COUNT],
            waves: [DEFAULT_WAVE; WAVE_COUNT],
            grooves: [groove; GROOVE_COUNT],
            words: [Word::default(); WORD_COUNT],
            word_names: default_word_names(),
            bookmarks: [0xFF; BOOKMARK_COUNT],
            meta: Meta::default(),
            reserved_1030: [0; 96],
            reserved_1fba: [0; 70],
            reserved_2000: [0; 32],
            reserved_3fb9: 0,
            reserved_3fbf: 0,
            reserved_3fc6: [0; 58],
            reserved_5fe0: [0; 32],
            reserved_7ff2: [0; 13],
        }
    }

    /// Parse a song from its 32 KiB image
    pub fn from_memory(memory: &SongMemory) -> Result<Self, Error> {
        let bytes = memory.as_bytes();
        check_markers(bytes)?;

        let mut song = Self::new();
        song.format_version = bytes[FORMAT_VERSION_OFFSET];

        // The allocation tables come first; they steer every conditional read
        for (index, chain) in song.chains.iter_mut().enumerate() {
            *chain = bit_set(&bytes[CHAIN_ALLOC_OFFSET..], index).then(Chain::default);
        }

        for (index, phrase) in song.phrases.iter_mut().enumerate() {
            *phrase = bit_set(&bytes[PHRASE_ALLOC_OFFSET..], index).then(Phrase::default);
        }

        for (index, instrument) in song.instruments.iter_mut().enumerate() {
            *instrument =
                (bytes[INSTRUMENT_ALLOC_OFFSET + index] != 0).then(Instrument::default);
        }

        for (index, table) in song.tables.iter_mut().enumerate() {
            *table = (bytes[TABLE_ALLOC_OFFSET + index] != 0).then(Table::default);
        }

        let mut reader = Cursor::new(bytes.as_slice());
        read_bank0(&mut reader, &mut song)?;
        read_bank1(&mut reader, &mut song)?;
        read_bank2(&mut reader, &mut song)?;
        read_bank3(&mut reader, &mut song)?;

        Ok(song)
    }

    /// Serialize the song to its 32 KiB image
    pub fn to_memory(&self) -> Result<SongMemory, Error> {
        let mut bytes = [0; SongMemory::LEN];

        let mut writer = Cursor::new(bytes.as_mut_slice());
        write_bank0(&mut writer, self)?;
        write_bank1(&mut writer, self)?;
        write_bank2(&mut writer, self)?;
        write_bank3(&mut writer, self)?;

        Ok(SongMemory { bytes })
    }

    /// Parse a song from an arbitrary I/O reader
    pub fn from_reader<R>(reader: R) -> Result<Self, Error>
    where
        R: Read,
    {
        let memory = SongMemory::from_reader(reader)?;
        Self::from_memory(&memory)
    }

    /// Serialize the song image to an arbitrary I/O writer
    pub fn to_writer<W>(&self, writer: W) -> Result<(), Error>
    where
        W: Write,
    {
        self.to_memory()?.to_writer(writer)
    }
}

impl Default for Song {
    fn default() -> Self {
        Self::new()
    }
}

/// The names the tracker gives its speech words out of the box: note names
/// from C 2 up to F 5, one per word
fn default_word_names() -> [[u8; WORD_NAME_LENGTH]; WORD_COUNT] {
    const LETTERS: &[u8; 12] = b"CCDDEFFGGAAB";
    std::array::from_fn(|index| {
        [
            LETTERS[index % 12],
            b' ',
            b'2' + (index / 12) as u8,
            b' ',
        ]
    })
}

fn bit_set(bits: &[u8], index: usize) -> bool {
    (bits[index / 8] >> (index % 8)) & 1 == 1
}

fn read_array<const N: usize, R>(mut reader: R) -> io::Result<[u8; N]>
where
    R: Read,
{
    let mut bytes = [0; N];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn read_byte<R>(reader: R) -> io::Result<u8>
where
    R: Read,
{
    Ok(read_array::<1, R>(reader)?[0])
}

fn skip<S>(mut seeker: S, count: i64) -> io::Result<()>
where
    S: Seek,
{
    seeker.seek(SeekFrom::Current(count))?;
    Ok(())
}

fn read_bank0<R>(reader: &mut R, song: &mut Song) -> Result<(), Error>
where
    R: Read + Seek,
{
    for phrase in &mut song.phrases {
        match phrase {
            Some(phrase) => phrase.notes = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    song.bookmarks = read_array(&mut *reader)?;
    song.reserved_1030 = read_array(&mut *reader)?;

    for groove in &mut song.grooves {
        *groove = read_array(&mut *reader)?;
    }

    for row in &mut song.rows {
        *row = Row::from_bytes(read_array(&mut *reader)?);
    }

    for table in &mut song.tables {
        match table {
            Some(table) => table.envelopes = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for word in &mut song.words {
        word.allophones = read_array(&mut *reader)?;
        word.lengths = read_array(&mut *reader)?;
    }

    for name in &mut song.word_names {
        *name = read_array(&mut *reader)?;
    }

    skip(&mut *reader, 2)?; // "rb"

    for instrument in &mut song.instruments {
        match instrument {
            Some(instrument) => instrument.name = read_array(&mut *reader)?,
            None => skip(&mut *reader, INSTRUMENT_NAME_LENGTH as i64)?,
        }
    }

    song.reserved_1fba = read_array(&mut *reader)?;

    debug_assert_eq!(reader.stream_position()?, 0x2000);

    Ok(())
}

fn read_bank1<R>(reader: &mut R, song: &mut Song) -> Result<(), Error>
where
    R: Read + Seek,
{
    song.reserved_2000 = read_array(&mut *reader)?;

    // The table and instrument allocation tables were consumed up front
    skip(&mut *reader, (TABLE_COUNT + INSTRUMENT_COUNT) as i64)?;

    for chain in &mut song.chains {
        match chain {
            Some(chain) => chain.phrases = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for chain in &mut song.chains {
        match chain {
            Some(chain) => chain.transpositions = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for instrument in &mut song.instruments {
        match instrument {
            Some(instrument) => instrument.bytes = read_array(&mut *reader)?,
            None => skip(&mut *reader, instrument::INSTRUMENT_BYTE_COUNT as i64)?,
        }
    }

    for table in &mut song.tables {
        match table {
            Some(table) => table.transpositions = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for table in &mut song.tables {
        match table {
            Some(table) => table.command1.commands = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for table in &mut song.tables {
        match table {
            Some(table) => table.command1.values = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for table in &mut song.tables {
        match table {
            Some(table) => table.command2.commands = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for table in &mut song.tables {
        match table {
            Some(table) => table.command2.values = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    // "rb", then the phrase and chain bitmaps, all consumed up front
    skip(&mut *reader, 2)?;
    skip(&mut *reader, (PHRASE_ALLOC_LEN + CHAIN_ALLOC_LEN) as i64)?;

    for synth in &mut song.synths {
        *synth = Synth::from_bytes(read_array(&mut *reader)?);
    }

    song.meta.work_time.hours = read_byte(&mut *reader)?;
    song.meta.work_time.minutes = read_byte(&mut *reader)?;
    song.tempo = read_byte(&mut *reader)?;
    song.transposition = read_byte(&mut *reader)?;
    song.meta.total_time.days = read_byte(&mut *reader)?;
    song.meta.total_time.hours = read_byte(&mut *reader)?;
    song.meta.total_time.minutes = read_byte(&mut *reader)?;
    song.reserved_3fb9 = read_byte(&mut *reader)?;
    song.meta.key_delay = read_byte(&mut *reader)?;
    song.meta.key_repeat = read_byte(&mut *reader)?;
    song.meta.font = read_byte(&mut *reader)?;
    song.meta.sync = read_byte(&mut *reader)?;
    song.meta.color_set = read_byte(&mut *reader)?;
    song.reserved_3fbf = read_byte(&mut *reader)?;
    song.meta.clone = read_byte(&mut *reader)?;
    song.meta.file_changed = read_byte(&mut *reader)?;
    song.meta.power_save = read_byte(&mut *reader)?;
    song.meta.pre_listen = read_byte(&mut *reader)?;

    let locks = unpack_overwrite_locks(read_array(&mut *reader)?);
    for (synth, overwritten) in song.synths.iter_mut().zip(locks) {
        synth.overwritten = overwritten;
    }

    song.reserved_3fc6 = read_array(&mut *reader)?;

    debug_assert_eq!(reader.stream_position()?, 0x4000);

    Ok(())
}

fn read_bank2<R>(reader: &mut R, song: &mut Song) -> Result<(), Error>
where
    R: Read + Seek,
{
    for phrase in &mut song.phrases {
        match phrase {
            Some(phrase) => phrase.commands.commands = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    for phrase in &mut song.phrases {
        match phrase {
            Some(phrase) => phrase.commands.values = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    song.reserved_5fe0 = read_array(&mut *reader)?;

    debug_assert_eq!(reader.stream_position()?, 0x6000);

    Ok(())
}

fn read_bank3<R>(reader: &mut R, song: &mut Song) -> Result<(), Error>
where
    R: Read + Seek,
{
    for wave in &mut song.waves {
        *wave = read_array(&mut *reader)?;
    }

    for phrase in &mut song.phrases {
        match phrase {
            Some(phrase) => phrase.instruments = read_array(&mut *reader)?,
            None => skip(&mut *reader, STEP_COUNT as i64)?,
        }
    }

    skip(&mut *reader, 2)?; // "rb"

    song.reserved_7ff2 = read_array(&mut *reader)?;

    skip(&mut *reader, 1)?; // format version, read up front

    debug_assert_eq!(reader.stream_position()?, SongMemory::LEN as u64);

    Ok(())
}

const PHRASE_ALLOC_LEN: usize = 32;
const CHAIN_ALLOC_LEN: usize = 16;

const STEP_FILL_ZERO: [u8; STEP_COUNT] = [0; STEP_COUNT];
const STEP_FILL_FF: [u8; STEP_COUNT] = [0xFF; STEP_COUNT];

fn write_bank0<W>(writer: &mut W, song: &Song) -> Result<(), Error>
where
    W: Write + Seek,
{
    for phrase in &song.phrases {
        match phrase {
            Some(phrase) => writer.write_all(&phrase.notes)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    writer.write_all(&song.bookmarks)?;
    writer.write_all(&song.reserved_1030)?;

    for groove in &song.grooves {
        writer.write_all(groove)?;
    }

    for row in &song.rows {
        writer.write_all(&row.to_bytes())?;
    }

    for table in &song.tables {
        match table {
            Some(table) => writer.write_all(&table.envelopes)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    for word in &song.words {
        writer.write_all(&word.allophones)?;
        writer.write_all(&word.lengths)?;
    }

    for name in &song.word_names {
        writer.write_all(name)?;
    }

    writer.write_all(&CHECK_VALUE)?;

    for instrument in &song.instruments {
        match instrument {
            Some(instrument) => writer.write_all(&instrument.name)?,
            None => writer.write_all(&[0; INSTRUMENT_NAME_LENGTH])?,
        }
    }

    writer.write_all(&song.reserved_1fba)?;

    debug_assert_eq!(writer.stream_position()?, 0x2000);

    Ok(())
}

fn write_bank1<W>(writer: &mut W, song: &Song) -> Result<(), Error>
where
    W: Write + Seek,
{
    writer.write_all(&song.reserved_2000)?;

    let mut table_alloc = [0; TABLE_COUNT];
    for (byte, table) in table_alloc.iter_mut().zip(&song.tables) {
        *byte = table.is_some() as u8;
    }
    writer.write_all(&table_alloc)?;

    let mut instrument_alloc = [0; INSTRUMENT_COUNT];
    for (byte, instrument) in instrument_alloc.iter_mut().zip(&song.instruments) {
        *byte = instrument.is_some() as u8;
    }
    writer.write_all(&instrument_alloc)?;

    for chain in &song.chains {
        match chain {
            Some(chain) => writer.write_all(&chain.phrases)?,
            None => writer.write_all(&STEP_FILL_FF)?,
        }
    }

    for chain in &song.chains {
        match chain {
            Some(chain) => writer.write_all(&chain.transpositions)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    for instrument in &song.instruments {
        match instrument {
            Some(instrument) => writer.write_all(&instrument.bytes)?,
            None => writer.write_all(&DEFAULT_INSTRUMENT)?,
        }
    }

    for table in &song.tables {
        match table {
            Some(table) => writer.write_all(&table.transpositions)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    for table in &song.tables {
        match table {
            Some(table) => writer.write_all(&table.command1.commands)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    for table in &song.tables {
        match table {
            Some(table) => writer.write_all(&table.command1.values)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    for table in &song.tables {
        match table {
            Some(table) => writer.write_all(&table.command2.commands)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    for table in &song.tables {
        match table {
            Some(table) => writer.write_all(&table.command2.values)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    writer.write_all(&CHECK_VALUE)?;

    let mut phrase_alloc = [0; PHRASE_ALLOC_LEN];
    for (index, phrase) in song.phrases.iter().enumerate() {
        if phrase.is_some() {
            phrase_alloc[index / 8] |= 1 << (index % 8);
        }
    }
    writer.write_all(&phrase_alloc)?;

    let mut chain_alloc = [0; CHAIN_ALLOC_LEN];
    for (index, chain) in song.chains.iter().enumerate() {
        if chain.is_some() {
            chain_alloc[index / 8] |= 1 << (index % 8);
        }
    }
    writer.write_all(&chain_alloc)?;

    for synth in &song.synths {
        writer.write_all(&synth.to_bytes())?;
    }

    writer.write_all(&[
        song.meta.work_time.hours,
        song.meta.work_time.minutes,
        song.tempo,
        song.transposition,
        song.meta.total_time.days,
        song.meta.total_time.hours,
        song.meta.total_time.minutes,
        song.reserved_3fb9,
        song.meta.key_delay,
        song.meta.key_repeat,
        song.meta.font,
        song.meta.sync,
        song.meta.color_set,
        song.reserved_3fbf,
        song.meta.clone,
        song.meta.file_changed,
        song.meta.power_save,
        song.meta.pre_listen,
    ])?;

    writer.write_all(&pack_overwrite_locks(&song.synths))?;

    writer.write_all(&song.reserved_3fc6)?;

    debug_assert_eq!(writer.stream_position()?, 0x4000);

    Ok(())
}

fn write_bank2<W>(writer: &mut W, song: &Song) -> Result<(), Error>
where
    W: Write + Seek,
{
    for phrase in &song.phrases {
        match phrase {
            Some(phrase) => writer.write_all(&phrase.commands.commands)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    for phrase in &song.phrases {
        match phrase {
            Some(phrase) => writer.write_all(&phrase.commands.values)?,
            None => writer.write_all(&STEP_FILL_ZERO)?,
        }
    }

    writer.write_all(&song.reserved_5fe0)?;

    debug_assert_eq!(writer.stream_position()?, 0x6000);

    Ok(())
}

fn write_bank3<W>(writer: &mut W, song: &Song) -> Result<(), Error>
where
    W: Write + Seek,
{
    for wave in &song.waves {
        writer.write_all(wave)?;
    }

    for phrase in &song.phrases {
        match phrase {
            Some(phrase) => writer.write_all(&phrase.instruments)?,
            None => writer.write_all(&STEP_FILL_FF)?,
        }
    }

    writer.write_all(&CHECK_VALUE)?;

    writer.write_all(&song.reserved_7ff2)?;
    writer.write_all(&[song.format_version])?;

    debug_assert_eq!(writer.stream_position()?, SongMemory::LEN as u64);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_song_roundtrip() {
        let song = Song::new();
        let memory = song.to_memory().expect("serialization failed");

        assert_eq!(memory.format_version(), 4);

        let parsed = Song::from_memory(&memory).expect("parsing failed");
        assert_eq!(parsed, song);
    }

    #[test]
    fn markers_and_fixed_offsets() {
        let mut song = Song::new();
        song.tempo = 0x77;
        song.transposition = 0x03;
        song.meta.file_changed = 1;

        let memory = song.to_memory().unwrap();
        let bytes = memory.as_slice();

        for offset in CHECK_OFFSETS {
            assert_eq!(&bytes[offset..offset + 2], b"rb");
        }

        assert_eq!(bytes[0x3FB4], 0x77);
        assert_eq!(bytes[0x3FB5], 0x03);
        assert_eq!(bytes[0x3FBA], 7); // key delay
        assert_eq!(bytes[0x3FBB], 2); // key repeat
        assert_eq!(bytes[0x3FC1], 1); // file changed
        assert_eq!(bytes[FORMAT_VERSION_OFFSET], 4);

        // A fresh song's wave memory is default waves throughout
        assert_eq!(&bytes[0x6000..0x6010], &DEFAULT_WAVE);
        assert_eq!(&bytes[0x6FF0..0x7000], &DEFAULT_WAVE);
    }

    #[test]
    fn missing_marker_is_a_format_error() {
        let mut memory = Song::new().to_memory().unwrap();
        memory.as_mut_slice()[0x3E80] = 0x00;

        let error = SongMemory::try_from(memory.as_slice()).unwrap_err();
        match error {
            Error::Format(message) => assert!(message.contains("0x3E80"), "{message}"),
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_size_is_a_format_error() {
        assert!(SongMemory::try_from([0_u8; 512].as_slice()).is_err());
    }

    #[test]
    fn single_instrument_roundtrip() {
        let mut song = Song::new();
        let mut instrument = Instrument::default();
        instrument.name.copy_from_slice(b"LEAD\0");
        instrument.bytes[1] = 0x21;
        song.instruments[0] = Some(instrument);

        let memory = song.to_memory().unwrap();
        let bytes = memory.as_slice();

        // One allocation byte set, payload in place, the rest default-filled
        assert_eq!(bytes[INSTRUMENT_ALLOC_OFFSET], 1);
        assert!(bytes[INSTRUMENT_ALLOC_OFFSET + 1..INSTRUMENT_ALLOC_OFFSET + INSTRUMENT_COUNT]
            .iter()
            .all(|byte| *byte == 0));
        assert_eq!(bytes[0x3080], 0xA8);
        assert_eq!(bytes[0x3081], 0x21);
        assert_eq!(&bytes[0x3090..0x30A0], &DEFAULT_INSTRUMENT);

        let parsed = Song::from_memory(&memory).unwrap();
        assert_eq!(parsed, song);
        assert!(parsed.instruments[0].is_some());
        assert!(parsed.instruments[1..].iter().all(Option::is_none));
    }

    #[test]
    fn chain_and_phrase_bitmaps() {
        let mut song = Song::new();
        song.chains[9] = Some(Chain::default());
        song.phrases[200] = Some(Phrase {
            notes: [0x3C; STEP_COUNT],
            ..Phrase::default()
        });

        let memory = song.to_memory().unwrap();
        let bytes = memory.as_slice();

        assert_eq!(bytes[CHAIN_ALLOC_OFFSET + 1], 1 << 1); // chain 9
        assert_eq!(bytes[PHRASE_ALLOC_OFFSET + 25], 1); // phrase 200

        // Unallocated chains fill their phrase steps with 0xFF
        assert_eq!(&bytes[0x2080..0x2090], &[0xFF; STEP_COUNT]);

        let parsed = Song::from_memory(&memory).unwrap();
        assert_eq!(parsed, song);
    }

    #[test]
    fn reserved_regions_roundtrip() {
        let mut song = Song::new();
        song.reserved_1030 = std::array::from_fn(|index| index as u8);
        song.reserved_3fc6 = [0xAB; 58];
        song.reserved_7ff2 = [0xCD; 13];

        let parsed = Song::from_memory(&song.to_memory().unwrap()).unwrap();
        assert_eq!(parsed.reserved_1030, song.reserved_1030);
        assert_eq!(parsed.reserved_3fc6, song.reserved_3fc6);
        assert_eq!(parsed.reserved_7ff2, song.reserved_7ff2);
    }

    #[test]
    fn default_word_names_cover_the_note_range() {
        let names = default_word_names();
        assert_eq!(&names[0], b"C 2 ");
        assert_eq!(&names[12], b"C 3 ");
        assert_eq!(&names[41], b"F 5 ");
    }
}
