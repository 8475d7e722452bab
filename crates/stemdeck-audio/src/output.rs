//! Device output through cpal.
//!
//! The output stream pulls interleaved stereo from the mixer's ring buffer
//! and plays silence whenever the ring runs dry.

use crate::ring_buffer::RingBuffer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use stemdeck_core::{Result, StemDeckError};
use tracing::{error, info};

/// A running output stream. Audio stops when this is dropped.
///
/// The underlying stream is not `Send`; keep this on the thread that opened it.
pub struct DeviceOutput {
    _stream: cpal::Stream,
    sample_rate: u32,
}

impl DeviceOutput {
    /// Open the default output device as a stereo f32 stream at
    /// `sample_rate` and start draining `ring` into it.
    pub fn open(ring: Arc<RingBuffer>, sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| StemDeckError::Playback("no audio output device available".into()))?;
        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate,
            "Opening audio output"
        );

        let config = cpal::StreamConfig {
            channels: 2,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let read = ring.read(data);
                    data[read..].fill(0.0);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| StemDeckError::Playback(format!("failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| StemDeckError::Playback(format!("failed to start output stream: {e}")))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
