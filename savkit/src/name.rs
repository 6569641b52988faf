//! Fixed-capacity name strings based on the tracker's character set

use std::{fmt, str};
use thiserror::Error;

/// A fixed-capacity, zero-padded string over the tracker's character subset
///
/// Project names in the save header are 8 bytes, instrument names in a song
/// image are 5. Both are padded with zeroes (or, in older saves, spaces) and
/// are not necessarily terminated: all `N` bytes may carry characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Name<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> Name<N> {
    // The special lightning bolt character (the actual glyph depends on the font)
    const LIGHTNING_BOLT_CHAR: u8 = 95;

    /// Try to convert a byte slice to a name
    ///
    /// Parsing stops at the first zero byte; everything after it is padding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, NameFromBytesError> {
        if bytes.len() > N {
            return Err(NameFromBytesError::TooLong);
        }

        let mut dest = [0; N];
        for (index, byte) in bytes.iter().enumerate() {
            match *byte {
                0 => break,
                byte if Self::is_byte_allowed(byte) => dest[index] = byte,
                byte => return Err(NameFromBytesError::DisallowedByte { byte, index }),
            }
        }

        Ok(Self { bytes: dest })
    }

    /// Access the underlying bytes, including any zero padding
    pub fn bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// The number of characters before the zero padding starts
    pub fn len(&self) -> usize {
        self.bytes.iter().position(|byte| *byte == 0).unwrap_or(N)
    }

    /// Are there _any_ characters in the name?
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View the name as a string slice
    pub fn as_str(&self) -> &str {
        // SAFETY: from_bytes() only lets through a subset of ASCII
        unsafe { str::from_utf8_unchecked(&self.bytes[..self.len()]) }
    }

    /// Is a byte within the subset of characters the tracker can display in names?
    ///
    /// Capitals A-Z, digits 0-9, space, and the lightning bolt glyph.
    pub fn is_byte_allowed(byte: u8) -> bool {
        byte.is_ascii_uppercase()
            || byte.is_ascii_digit()
            || byte == b' '
            || byte == Self::LIGHTNING_BOLT_CHAR
    }
}

impl<const N: usize> Default for Name<N> {
    fn default() -> Self {
        Self { bytes: [0; N] }
    }
}

impl<const N: usize> fmt::Display for Name<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl<const N: usize> TryFrom<&str> for Name<N> {
    type Error = NameFromBytesError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_bytes(value.as_bytes())
    }
}

/// An error describing what could go wrong converting bytes to a [`Name`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameFromBytesError {
    /// The source slice does not fit in the name array
    #[error("The slice did not fit in the name array")]
    TooLong,

    /// A byte outside the tracker's name character set was encountered
    #[error("Byte {byte} at position {index} is not allowed as a name character")]
    DisallowedByte { byte: u8, index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes() {
        let name = Name::<8>::from_bytes(b"KICK2").expect("valid name bytes rejected");
        assert_eq!(name.len(), 5);
        assert!(!name.is_empty());
        assert_eq!(name.as_str(), "KICK2");
        assert_eq!(name.to_string(), "KICK2");
    }

    #[test]
    fn too_many_bytes() {
        assert_eq!(
            Name::<4>::from_bytes(b"TOOLONG"),
            Err(NameFromBytesError::TooLong)
        );
    }

    #[test]
    fn disallowed_bytes() {
        // Lowercase and punctuation are outside the tracker's character set
        assert_eq!(
            Name::<8>::from_bytes(b"q"),
            Err(NameFromBytesError::DisallowedByte { byte: b'q', index: 0 })
        );

        assert_eq!(
            Name::<8>::from_bytes(b"OK?"),
            Err(NameFromBytesError::DisallowedByte { byte: b'?', index: 2 })
        );
    }

    #[test]
    fn space_padded() {
        let name = Name::<8>::from_bytes("AB 2    ".as_bytes()).expect("bytes rejected");
        assert_eq!(name.len(), 8);
        assert_eq!(name.as_str(), "AB 2    ");
    }

    #[test]
    fn stops_at_zero() {
        let name = Name::<8>::from_bytes(&[b'O', b'K', 0, b'!', b'!']).expect("bytes rejected");
        assert_eq!(name.as_str(), "OK");
    }

    #[test]
    fn default_is_the_empty_name() {
        let name = Name::<5>::default();
        assert!(name.is_empty());
        assert_eq!(name.bytes(), &[0; 5]);
        assert_eq!(name.to_string(), "");
    }
}
