//! Playback units.
//!
//! A playback unit is one stem's independently controllable player: it has
//! its own cursor, play/pause state and volume. The transport drives many of
//! them as one logical player, but nothing ties their cursors together apart
//! from the seeks the transport issues.

use std::sync::Arc;
use stemdeck_core::{frames_to_seconds, seconds_to_frames, DecodedAudio, Result, StemDeckError};

/// Per-stem player handle.
pub trait PlaybackUnit: Send {
    /// Start playback from the current cursor.
    ///
    /// A unit that has run to its end restarts from the beginning.
    fn play(&mut self) -> Result<()>;

    /// Stop advancing without moving the cursor.
    fn pause(&mut self);

    /// Move the cursor, in seconds. Out-of-range positions are clamped.
    fn seek(&mut self, seconds: f64);

    /// Cursor position in seconds.
    fn current_time(&self) -> f64;

    /// Total length in seconds.
    fn duration(&self) -> f64;

    /// Output multiplier in [0, 1].
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    fn is_playing(&self) -> bool;

    /// Returns `true` once after the unit reached its end on its own.
    fn take_ended(&mut self) -> bool;

    /// Add the next `out.len() / 2` stereo frames, scaled by the volume, into
    /// `out` and advance the cursor. Returns the number of frames rendered.
    fn render(&mut self, out: &mut [f32]) -> usize;
}

/// Playback unit over a decoded stem held in memory.
#[derive(Debug, Clone)]
pub struct MemoryPlaybackUnit {
    /// Interleaved stereo samples.
    samples: Arc<[f32]>,
    sample_rate: u32,
    /// Cursor in frames.
    cursor: usize,
    playing: bool,
    ended: bool,
    volume: f32,
}

impl MemoryPlaybackUnit {
    /// Create a unit from decoded audio. Mono input is duplicated to stereo.
    pub fn from_decoded(audio: &DecodedAudio) -> Self {
        Self::from_interleaved(audio.to_interleaved_stereo(), audio.sample_rate)
    }

    /// Create a unit from interleaved stereo samples.
    pub fn from_interleaved(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            cursor: 0,
            playing: false,
            ended: false,
            volume: 1.0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Cursor in frames.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl PlaybackUnit for MemoryPlaybackUnit {
    fn play(&mut self) -> Result<()> {
        if self.frame_count() == 0 || self.sample_rate == 0 {
            return Err(StemDeckError::Playback("no audio loaded".into()));
        }
        if self.cursor >= self.frame_count() {
            self.cursor = 0;
        }
        self.ended = false;
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, seconds: f64) {
        self.cursor = seconds_to_frames(seconds, self.sample_rate).min(self.frame_count());
        self.ended = false;
    }

    fn current_time(&self) -> f64 {
        frames_to_seconds(self.cursor, self.sample_rate)
    }

    fn duration(&self) -> f64 {
        frames_to_seconds(self.frame_count(), self.sample_rate)
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn take_ended(&mut self) -> bool {
        std::mem::take(&mut self.ended)
    }

    fn render(&mut self, out: &mut [f32]) -> usize {
        if !self.playing {
            return 0;
        }
        let remaining = self.frame_count().saturating_sub(self.cursor);
        let frames = (out.len() / 2).min(remaining);

        let start = self.cursor * 2;
        let src = &self.samples[start..start + frames * 2];
        for (dst, &s) in out.iter_mut().zip(src) {
            *dst += s * self.volume;
        }

        self.cursor += frames;
        if self.cursor >= self.frame_count() {
            self.playing = false;
            self.ended = true;
        }
        frames
    }
}
