//! Reading and writing the battery save format of an 8-bit handheld music
//! tracker.
//!
//! A save is 128 KiB of SRAM: one uncompressed 32 KiB song in working memory,
//! followed by a miniature filesystem where up to 32 named, versioned projects
//! are stored compressed into 512-byte blocks. This crate covers all three
//! layers:
//!
//!  * [`sav`] — the save container: header, project slots, block-owner table
//!    and the block region itself.
//!  * [`serde`] — the run-length + dictionary stream codec that packs song
//!    images into blocks and unpacks them again.
//!  * [`song`] — the 32 KiB song image: its four 8 KiB banks, allocation
//!    tables and every sub-record they gate (chains, phrases, instruments,
//!    tables, synths, waves, grooves, speech words).
//!
//! This crate does not emulate the tracker or synthesize audio; it only cares
//! about the persistent format.

pub mod error;
pub mod name;
pub mod sav;
pub mod serde;
pub mod song;

pub use error::Error;

pub use ux::u5;
