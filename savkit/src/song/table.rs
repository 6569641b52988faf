//! Tables: envelope/transposition/command grids driven alongside notes

use super::STEP_COUNT;
use crate::error::Error;

/// One of the up to 32 tables in a song
///
/// A table is a 16-step grid: a volume envelope, a transposition and two
/// command/value pairs per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Table {
    pub envelopes: [u8; STEP_COUNT],
    pub transpositions: [u8; STEP_COUNT],
    pub command1: CommandColumn,
    pub command2: CommandColumn,
}

/// A column of effect commands plus their argument values
///
/// Commands are kept in their stored byte form so that foreign images round-
/// trip losslessly; [`CommandColumn::command`] and
/// [`CommandColumn::set_command`] translate to and from [`Command`] using the
/// encoding of the image's format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandColumn {
    pub(crate) commands: [u8; STEP_COUNT],
    pub(crate) values: [u8; STEP_COUNT],
}

impl CommandColumn {
    /// The command at a step, if its stored byte is a known command
    pub fn command(&self, step: usize, format_version: u8) -> Option<Command> {
        Command::from_byte(self.commands[step], format_version)
    }

    /// Store a command at a step
    ///
    /// Fails for [`Command::B`] on format versions older than 8, which have
    /// no encoding for it.
    pub fn set_command(
        &mut self,
        step: usize,
        command: Command,
        format_version: u8,
    ) -> Result<(), Error> {
        self.commands[step] = command.to_byte(format_version)?;
        Ok(())
    }

    /// The argument value at a step
    pub fn value(&self, step: usize) -> u8 {
        self.values[step]
    }

    /// Change the argument value at a step
    pub fn set_value(&mut self, step: usize, value: u8) {
        self.values[step] = value;
    }
}

/// An effect command, as it appears in tables and phrases
///
/// `B` (break) was added to the tracker in format version 8; every older
/// command with a stored byte above 1 shifted up by one to make room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    None = 0,
    A,
    C,
    D,
    E,
    F,
    G,
    H,
    K,
    L,
    M,
    O,
    P,
    R,
    S,
    T,
    V,
    W,
    Z,
    B,
}

impl Command {
    /// The version-independent ordinal (B sits outside the ordinal scale)
    fn ordinal(self) -> u8 {
        self as u8
    }

    fn from_ordinal(ordinal: u8) -> Option<Self> {
        const ORDERED: [Command; 19] = [
            Command::None,
            Command::A,
            Command::C,
            Command::D,
            Command::E,
            Command::F,
            Command::G,
            Command::H,
            Command::K,
            Command::L,
            Command::M,
            Command::O,
            Command::P,
            Command::R,
            Command::S,
            Command::T,
            Command::V,
            Command::W,
            Command::Z,
        ];
        ORDERED.get(ordinal as usize).copied()
    }

    /// Decode a stored command byte for a given format version
    pub fn from_byte(byte: u8, format_version: u8) -> Option<Self> {
        if format_version >= 8 {
            match byte {
                0 => Some(Self::None),
                1 => Some(Self::B),
                byte => Self::from_ordinal(byte - 1),
            }
        } else {
            Self::from_ordinal(byte)
        }
    }

    /// Encode a command to its stored byte for a given format version
    pub fn to_byte(self, format_version: u8) -> Result<u8, Error> {
        if format_version >= 8 {
            Ok(match self {
                Self::B => 1,
                command => {
                    let ordinal = command.ordinal();
                    if ordinal > 1 {
                        ordinal + 1
                    } else {
                        ordinal
                    }
                }
            })
        } else {
            match self {
                Self::B => Err(Error::format(
                    "command B is not encodable before format version 8",
                )),
                command => Ok(command.ordinal()),
            }
        }
    }
}
