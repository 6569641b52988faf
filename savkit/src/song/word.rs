//! Speech synth words

/// The number of allophones (and lengths) a speech word holds
pub const WORD_LENGTH: usize = 16;

/// One word for the speech synth: allophone indices plus a length per slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    pub allophones: [u8; WORD_LENGTH],
    pub lengths: [u8; WORD_LENGTH],
}

impl Default for Word {
    fn default() -> Self {
        Self {
            allophones: [0; WORD_LENGTH],
            lengths: [0; WORD_LENGTH],
        }
    }
}
