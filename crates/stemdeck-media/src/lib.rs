//! StemDeck Media - stem I/O
//!
//! This crate holds the collaborators the playback core talks to:
//! - Stem sources (raw bytes per stem key)
//! - Audio decoding via symphonia
//! - WAV encoding via hound
//! - Ordered batch export of stems to disk

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod export;
pub mod source;

pub use decoder::{AudioDecoder, SymphoniaDecoder};
pub use encoder::{AudioEncoder, WavEncoder, WavSampleFormat};
pub use error::{MediaError, MediaResult};
pub use export::{export_all, write_stem, ExportReport};
pub use source::{DirectoryStemSource, MemoryStemSource, StemSource};
