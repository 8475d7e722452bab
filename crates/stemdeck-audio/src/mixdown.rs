//! Mixdown engine.
//!
//! Collapses a selection of stems into one new stereo artifact. The engine
//! works from the raw stem bytes, never from the live playback units, so a
//! merge does not disturb what is currently playing.
//!
//! Steps:
//! 1. Fetch and decode every selected stem concurrently (fail-fast).
//! 2. Sum the decoded buffers sample by sample into interleaved stereo.
//! 3. Hand the sum to the encoder.

use futures::future::try_join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use stemdeck_core::{DecodedAudio, StemKey, TARGET_SAMPLE_RATE};
use stemdeck_media::{AudioDecoder, AudioEncoder, StemSource};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors returned by a merge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("No stems selected for merge")]
    EmptySelection,

    #[error("Failed to decode stem {key}: {reason}")]
    DecodeFailed { key: StemKey, reason: String },

    #[error("None of the selected stems had audio data")]
    NoInput,

    #[error("A merge is already in progress")]
    AlreadyInProgress,

    #[error("Failed to encode merge result: {0}")]
    EncodeFailed(String),
}

/// Where the current merge stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergeStatus {
    #[default]
    Idle,
    Merging,
    Complete,
    /// The message is kept until the user dismisses it.
    Failed(String),
}

/// Selection state while merge mode is active.
#[derive(Debug, Clone)]
pub struct MergeSession {
    id: Uuid,
    selected: Vec<StemKey>,
}

impl MergeSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            selected: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Selected keys in the order they were picked.
    pub fn selected(&self) -> &[StemKey] {
        &self.selected
    }

    pub fn is_selected(&self, key: &StemKey) -> bool {
        self.selected.contains(key)
    }

    /// Flip a key's selection. Returns whether it is now selected.
    pub fn toggle(&mut self, key: &StemKey) -> bool {
        match self.selected.iter().position(|k| k == key) {
            Some(index) => {
                self.selected.remove(index);
                false
            }
            None => {
                self.selected.push(key.clone());
                true
            }
        }
    }
}

impl Default for MergeSession {
    fn default() -> Self {
        Self::new()
    }
}

/// A finished merge.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// Encoded artifact.
    pub bytes: Vec<u8>,
    /// The summed audio, ready for a playback unit.
    pub mix: DecodedAudio,
    /// Stems that went into the sum.
    pub sources: Vec<StemKey>,
    /// Selected stems the source had no data for.
    pub missing: Vec<StemKey>,
}

/// Sum decoded buffers into one interleaved stereo buffer.
///
/// The output is as long as the first buffer. Shorter buffers stop
/// contributing at their end and longer ones are cut. Mono buffers feed
/// both channels; for more than two channels only the first two are used.
/// Nothing is normalized or clipped.
pub fn sum_to_stereo(buffers: &[DecodedAudio]) -> Vec<f32> {
    let Some(first) = buffers.first() else {
        return Vec::new();
    };
    let frames = first.frame_count();
    let mut out = vec![0.0f32; frames * 2];

    for buffer in buffers {
        let Some((left, right)) = buffer.stereo_pair() else {
            continue;
        };
        for (frame, (l, r)) in out.chunks_exact_mut(2).zip(left.iter().zip(right)) {
            frame[0] += l;
            frame[1] += r;
        }
    }
    out
}

/// Resets the in-flight flag when a merge finishes or its future is dropped.
struct InFlight<'a>(&'a Mutex<bool>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0.lock() = false;
    }
}

/// Fetch, decode, sum and encode a selection of stems.
pub struct MixdownEngine<D, E> {
    decoder: D,
    encoder: E,
    target_sample_rate: u32,
    in_flight: Mutex<bool>,
    batches: AtomicUsize,
}

impl<D: AudioDecoder, E: AudioEncoder> MixdownEngine<D, E> {
    pub fn new(decoder: D, encoder: E) -> Self {
        Self::with_sample_rate(decoder, encoder, TARGET_SAMPLE_RATE)
    }

    /// Engine that encodes its output at `sample_rate`.
    pub fn with_sample_rate(decoder: D, encoder: E, sample_rate: u32) -> Self {
        Self {
            decoder,
            encoder,
            target_sample_rate: sample_rate,
            in_flight: Mutex::new(false),
            batches: AtomicUsize::new(0),
        }
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn is_merging(&self) -> bool {
        *self.in_flight.lock()
    }

    /// Number of decode batches started so far.
    pub fn batches_started(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    fn begin(&self) -> Result<InFlight<'_>, MergeError> {
        let mut flag = self.in_flight.lock();
        if *flag {
            return Err(MergeError::AlreadyInProgress);
        }
        *flag = true;
        Ok(InFlight(&self.in_flight))
    }

    /// Merge `keys` from `source` into one stereo artifact.
    ///
    /// An empty selection is rejected before anything else happens. Any
    /// fetch or decode failure aborts the whole merge. Keys the source has
    /// no data for are left out; if that leaves nothing, the merge fails
    /// with `NoInput`.
    pub async fn merge<S: StemSource>(
        &self,
        source: &S,
        keys: &[StemKey],
    ) -> Result<MergeOutput, MergeError> {
        if keys.is_empty() {
            return Err(MergeError::EmptySelection);
        }
        let _in_flight = self.begin()?;
        let batch = self.batches.fetch_add(1, Ordering::Relaxed) + 1;
        info!(batch, stems = keys.len(), "Starting mixdown");

        let decoded = try_join_all(keys.iter().map(|key| self.fetch_and_decode(source, key))).await?;

        let mut sources = Vec::new();
        let mut missing = Vec::new();
        let mut buffers = Vec::new();
        for (key, audio) in keys.iter().zip(decoded) {
            match audio {
                Some(audio) => {
                    sources.push(key.clone());
                    buffers.push(audio);
                }
                None => missing.push(key.clone()),
            }
        }
        if buffers.is_empty() {
            return Err(MergeError::NoInput);
        }

        let frames = buffers[0].frame_count();
        for (key, audio) in sources.iter().zip(&buffers) {
            if audio.sample_rate != self.target_sample_rate {
                warn!(
                    key = %key,
                    sample_rate = audio.sample_rate,
                    target = self.target_sample_rate,
                    "Stem sample rate differs from the merge rate, summing without resampling"
                );
            }
            if audio.frame_count() != frames {
                warn!(key = %key, frames = audio.frame_count(), expected = frames, "Stem length differs from the first stem");
            }
        }

        let mixed = sum_to_stereo(&buffers);
        let bytes = self
            .encoder
            .encode(&mixed, 2, self.target_sample_rate)
            .map_err(|e| MergeError::EncodeFailed(e.to_string()))?;
        let mix = DecodedAudio::from_interleaved(&mixed, 2, self.target_sample_rate);

        info!(batch, frames, bytes = bytes.len(), "Mixdown complete");
        Ok(MergeOutput {
            bytes,
            mix,
            sources,
            missing,
        })
    }

    async fn fetch_and_decode<S: StemSource>(
        &self,
        source: &S,
        key: &StemKey,
    ) -> Result<Option<DecodedAudio>, MergeError> {
        let failed = |reason: String| MergeError::DecodeFailed {
            key: key.clone(),
            reason,
        };
        let Some(bytes) = source.fetch(key).await.map_err(|e| failed(e.to_string()))? else {
            warn!(key = %key, "Selected stem has no data, leaving it out of the merge");
            return Ok(None);
        };
        let audio = self.decoder.decode(&bytes).map_err(|e| failed(e.to_string()))?;
        debug!(key = %key, frames = audio.frame_count(), channels = audio.channel_count(), "Decoded stem for merge");
        Ok(Some(audio))
    }
}
