//! StemDeck Core - Foundation types for stem playback
//!
//! This crate provides the types shared by every StemDeck crate:
//! - Stem identity (StemKey, StemKind)
//! - Decoded PCM buffers (DecodedAudio)
//! - Playhead time helpers
//! - Deck configuration
//! - The error type used by the store and transport

pub mod audio;
pub mod config;
pub mod error;
pub mod stem;
pub mod time;

pub use audio::DecodedAudio;
pub use config::DeckConfig;
pub use error::{Result, StemDeckError};
pub use stem::{StemKey, StemKind};
pub use time::{format_time, frames_to_seconds, seconds_to_frames};

/// Sample rate every stem and merge result is expected to share.
pub const TARGET_SAMPLE_RATE: u32 = 44_100;

/// Gain assigned to a stem that has not been touched by the mixer.
pub const DEFAULT_GAIN: f32 = 80.0;
