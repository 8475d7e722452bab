//! Deck configuration.

use crate::error::{Result, StemDeckError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Tunables for the transport, mixer and mixdown.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    /// Cadence of the shared playhead refresh, in milliseconds.
    pub poll_interval_ms: u64,
    /// Gain given to newly added stems (0-100).
    pub default_gain: f32,
    /// Sample rate stems are decoded at and merges are encoded at.
    pub target_sample_rate: u32,
    /// Upper bound of the random term added to the synthetic meter.
    pub meter_jitter: f32,
    /// Fraction of the gain used as the meter's base level.
    pub meter_gain_scale: f32,
    /// Size of the device output ring buffer, in milliseconds of audio.
    pub output_buffer_ms: u64,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            default_gain: crate::DEFAULT_GAIN,
            target_sample_rate: crate::TARGET_SAMPLE_RATE,
            meter_jitter: 20.0,
            meter_gain_scale: 0.8,
            output_buffer_ms: 100,
        }
    }
}

impl DeckConfig {
    /// Playhead refresh cadence.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Output ring buffer capacity in interleaved stereo samples.
    pub fn output_buffer_samples(&self) -> usize {
        (self.target_sample_rate as u64 * self.output_buffer_ms / 1000) as usize * 2
    }

    /// Default location: `<config dir>/stemdeck/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stemdeck").join("config.json"))
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| StemDeckError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        info!(path = %path.display(), "Loaded deck config");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| StemDeckError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Reject values the deck cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.target_sample_rate == 0 {
            return Err(StemDeckError::Config("target_sample_rate must be > 0".into()));
        }
        if !(0.0..=100.0).contains(&self.default_gain) {
            return Err(StemDeckError::Config(format!(
                "default_gain {} outside 0-100",
                self.default_gain
            )));
        }
        if !(self.meter_jitter >= 0.0 && self.meter_jitter.is_finite()) {
            return Err(StemDeckError::Config("meter_jitter must be finite and >= 0".into()));
        }
        if !(self.meter_gain_scale >= 0.0 && self.meter_gain_scale.is_finite()) {
            return Err(StemDeckError::Config(format!(
                "meter_gain_scale {} must be finite and >= 0",
                self.meter_gain_scale
            )));
        }
        Ok(())
    }
}
