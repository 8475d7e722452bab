//! WAV encoding using hound.
//!
//! The mixdown engine hands interleaved PCM to an `AudioEncoder` and gets
//! back a complete, playable file in memory.

use crate::error::{MediaError, MediaResult};
use std::io::Cursor;
use tracing::debug;

/// Serializes interleaved PCM into a playable container.
pub trait AudioEncoder: Send + Sync {
    /// Encode `interleaved` samples with `channels` channels at `sample_rate`.
    fn encode(&self, interleaved: &[f32], channels: u16, sample_rate: u32) -> MediaResult<Vec<u8>>;

    /// File extension of the produced container.
    fn extension(&self) -> &'static str;
}

/// Sample format written to the WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WavSampleFormat {
    /// 32-bit IEEE float. Keeps out-of-range sums intact.
    #[default]
    Float32,
    /// 16-bit signed PCM. Samples are clamped to [-1, 1] before quantizing.
    Int16,
}

/// In-memory WAV writer.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavEncoder {
    format: WavSampleFormat,
}

impl WavEncoder {
    pub fn new(format: WavSampleFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> WavSampleFormat {
        self.format
    }
}

impl AudioEncoder for WavEncoder {
    fn encode(&self, interleaved: &[f32], channels: u16, sample_rate: u32) -> MediaResult<Vec<u8>> {
        if channels == 0 {
            return Err(MediaError::Encode("zero channels".into()));
        }
        if interleaved.len() % channels as usize != 0 {
            return Err(MediaError::Encode(format!(
                "{} samples is not a whole number of {}-channel frames",
                interleaved.len(),
                channels
            )));
        }

        let spec = match self.format {
            WavSampleFormat::Float32 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            },
            WavSampleFormat::Int16 => hound::WavSpec {
                channels,
                sample_rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            },
        };

        let mut bytes = Vec::with_capacity(44 + interleaved.len() * 4);
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec)
                .map_err(|e| MediaError::Encode(e.to_string()))?;
            match self.format {
                WavSampleFormat::Float32 => {
                    for &s in interleaved {
                        writer
                            .write_sample(s)
                            .map_err(|e| MediaError::Encode(e.to_string()))?;
                    }
                }
                WavSampleFormat::Int16 => {
                    for &s in interleaved {
                        let quantized = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16;
                        writer
                            .write_sample(quantized)
                            .map_err(|e| MediaError::Encode(e.to_string()))?;
                    }
                }
            }
            writer
                .finalize()
                .map_err(|e| MediaError::Encode(e.to_string()))?;
        }

        debug!(
            channels,
            sample_rate,
            bytes = bytes.len(),
            "Encoded WAV"
        );
        Ok(bytes)
    }

    fn extension(&self) -> &'static str {
        "wav"
    }
}
