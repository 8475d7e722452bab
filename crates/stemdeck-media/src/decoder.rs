//! Audio decoding using symphonia.
//!
//! Stems arrive as encoded bytes (usually WAV from the separation step).
//! The decoder turns them into per-channel f32 arrays at the file's native
//! sample rate. No resampling is done here.

use crate::error::{MediaError, MediaResult};
use std::io::Cursor;
use stemdeck_core::DecodedAudio;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Turns raw stem bytes into PCM.
pub trait AudioDecoder: Send + Sync {
    /// Decode a complete in-memory file.
    fn decode(&self, bytes: &[u8]) -> MediaResult<DecodedAudio>;
}

/// Decoder backed by symphonia's default probe and codec registry.
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    /// Optional extension hint ("wav", "flac", ...) to speed up probing.
    extension: Option<String>,
}

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that hints the container format to the probe.
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
        }
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8]) -> MediaResult<DecodedAudio> {
        if bytes.is_empty() {
            return Err(MediaError::Decode("empty input".into()));
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| MediaError::UnsupportedFormat(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| MediaError::UnsupportedFormat("no audio track".into()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| MediaError::Decode("unknown sample rate".into()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| MediaError::UnsupportedFormat(e.to_string()))?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(MediaError::Decode(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // A corrupt packet is dropped; the rest of the stream is kept.
                    warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(MediaError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let channel_count = spec.channels.count();
            if channels.is_empty() {
                channels = vec![Vec::new(); channel_count];
            }

            let needed = decoded.capacity() * channel_count;
            if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed) {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            let Some(buf) = sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);

            for frame in buf.samples().chunks_exact(channel_count) {
                for (c, &s) in frame.iter().enumerate().take(channels.len()) {
                    channels[c].push(s);
                }
            }
        }

        if channels.is_empty() {
            return Err(MediaError::Decode("stream contained no audio".into()));
        }

        let audio = DecodedAudio::new(sample_rate, channels);
        debug!(
            sample_rate,
            channels = audio.channel_count(),
            frames = audio.frame_count(),
            "Decoded stem"
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{AudioEncoder, WavEncoder, WavSampleFormat};

    #[test]
    fn test_decode_float_wav() {
        let interleaved = vec![0.5, -0.5, 0.25, -0.25, 0.0, 1.0];
        let bytes = WavEncoder::default().encode(&interleaved, 2, 44100).unwrap();

        let audio = SymphoniaDecoder::new().decode(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.channel_count(), 2);
        assert_eq!(audio.channels[0], vec![0.5, 0.25, 0.0]);
        assert_eq!(audio.channels[1], vec![-0.5, -0.25, 1.0]);
    }

    #[test]
    fn test_decode_mono_int16_wav() {
        let encoder = WavEncoder::new(WavSampleFormat::Int16);
        let bytes = encoder.encode(&[0.0, 0.5, -0.5, 0.0], 1, 22050).unwrap();

        let audio = SymphoniaDecoder::with_extension("wav").decode(&bytes).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.channel_count(), 1);
        assert_eq!(audio.frame_count(), 4);
        assert!((audio.channels[0][1] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = SymphoniaDecoder::new().decode(b"definitely not audio");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(matches!(
            SymphoniaDecoder::new().decode(&[]),
            Err(MediaError::Decode(_))
        ));
    }
}
