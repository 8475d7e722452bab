//! Channel mixer.
//!
//! Owns the per-stem gain (0-100) and pushes it to the stem's live unit as a
//! volume multiplier. Also renders the playing units into the device ring
//! buffer and produces the channel-strip meter readings.

use crate::ring_buffer::RingBuffer;
use crate::store::{Stem, StemStore};
use rand::Rng;
use stemdeck_core::{DeckConfig, Result, StemKey};
use tracing::trace;

/// Clamp a user gain to 0-100. NaN maps to 0.
pub fn clamp_gain(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Frames rendered per pass; longer renders are split into passes.
const CHUNK_FRAMES: usize = 2048;

/// Per-stem gain control, meters and live summing.
#[derive(Debug)]
pub struct ChannelMixer {
    meter_jitter: f32,
    meter_gain_scale: f32,
    /// Scratch buffer for one render pass (interleaved stereo).
    scratch: Vec<f32>,
}

impl ChannelMixer {
    pub fn new(config: &DeckConfig) -> Self {
        Self {
            meter_jitter: config.meter_jitter.max(0.0),
            meter_gain_scale: config.meter_gain_scale,
            scratch: vec![0.0; CHUNK_FRAMES * 2],
        }
    }

    /// Set a stem's gain, clamped to 0-100, and apply `gain / 100` to its
    /// unit immediately. Returns the stored value.
    pub fn set_gain(&self, store: &mut StemStore, key: &StemKey, value: f32) -> Result<f32> {
        let gain = clamp_gain(value);
        let stem = store.get_mut(key)?;
        stem.gain = gain;
        stem.unit.set_volume(gain / 100.0);
        trace!(key = %key, gain, "Gain set");
        Ok(gain)
    }

    /// Meter reading for a channel strip, 0-100.
    ///
    /// This is a cosmetic estimate, not a measurement: while the stem plays
    /// it is `gain * scale` plus a random term in `[0, jitter)`, capped at
    /// 100, and it drops to 0 as soon as the stem stops. No samples are
    /// inspected.
    pub fn meter_level(&self, store: &StemStore, key: &StemKey) -> Result<f32> {
        let stem = store.get(key)?;
        Ok(self.meter_level_with(stem, &mut rand::thread_rng()))
    }

    /// `meter_level` with a caller-supplied random source.
    pub fn meter_level_with<R: Rng + ?Sized>(&self, stem: &Stem, rng: &mut R) -> f32 {
        if !stem.is_playing() {
            return 0.0;
        }
        let jitter = if self.meter_jitter > 0.0 {
            rng.gen::<f32>() * self.meter_jitter
        } else {
            0.0
        };
        (stem.gain() * self.meter_gain_scale + jitter).min(100.0)
    }

    /// Render `frames` stereo frames of every playing stem and queue the sum
    /// in `output`. Without an output the frames are rendered and dropped,
    /// which still advances the units.
    ///
    /// Work is done in fixed-size passes. Rendering stops early once the
    /// ring is full, or, without a ring, once no playing unit has frames
    /// left.
    ///
    /// Returns the number of samples queued.
    pub fn render(&mut self, store: &mut StemStore, frames: usize, output: Option<&RingBuffer>) -> usize {
        let mut remaining = frames;
        let mut queued = 0usize;
        while remaining > 0 {
            let chunk = remaining.min(CHUNK_FRAMES);
            let buf = &mut self.scratch[..chunk * 2];
            buf.fill(0.0);

            let mut rendered = 0;
            for stem in store.iter_mut().filter(|s| s.is_playing) {
                rendered = rendered.max(stem.unit.render(buf));
            }
            remaining -= chunk;

            match output {
                Some(ring) => {
                    let written = ring.write(buf);
                    queued = queued.saturating_add(written);
                    if written < buf.len() {
                        break;
                    }
                }
                None if rendered == 0 => break,
                None => {}
            }
        }
        queued
    }
}
