//! Decoded PCM audio.

/// Decoded audio held as one sample array per channel.
///
/// This is what the decoder collaborator returns and what the mixdown
/// engine sums. Channels are expected to have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Per-channel sample data (`channels[c][i]`).
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    /// Create from per-channel buffers.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// Create a single-channel buffer.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![samples])
    }

    /// Create a two-channel buffer.
    pub fn stereo(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self::new(sample_rate, vec![left, right])
    }

    /// Split interleaved samples into per-channel arrays.
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Self {
        if channel_count == 0 {
            return Self::new(sample_rate, Vec::new());
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (c, &s) in frame.iter().enumerate() {
                channels[c].push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    /// Number of channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// The left/right source arrays for stereo output.
    ///
    /// Mono buffers feed their only channel to both sides; buffers with more
    /// than two channels contribute channels 0 and 1. Returns `None` for a
    /// buffer with no channels.
    pub fn stereo_pair(&self) -> Option<(&[f32], &[f32])> {
        let left = self.channels.first()?;
        let right = self.channels.get(1).unwrap_or(left);
        Some((left.as_slice(), right.as_slice()))
    }

    /// Interleave into `[L, R, L, R, ...]`, duplicating mono input.
    pub fn to_interleaved_stereo(&self) -> Vec<f32> {
        let Some((left, right)) = self.stereo_pair() else {
            return Vec::new();
        };
        let frames = left.len().min(right.len());
        let mut out = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            out.push(left[i]);
            out.push(right[i]);
        }
        out
    }
}
