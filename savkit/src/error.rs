//! The error type shared by every fallible operation in this crate

use std::io;
use thiserror::Error;

/// Anything that can go wrong reading or writing save data
///
/// Errors are plain values; a failed operation leaves its output buffers in an
/// unspecified (but safe) state and the caller is expected to discard them.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying stream failed, or ended short
    #[error("I/O failed")]
    Io(#[from] io::Error),

    /// A structural check failed; the message names the check
    #[error("format violation: {0}")]
    Format(String),

    /// The compressed song does not fit in the blocks that are left
    #[error("the song does not fit in the remaining blocks")]
    Capacity,
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}
