//! Decoded stem store.
//!
//! The store is the single owner of every stem's playback unit and of the
//! encoded bytes of the current merge result. The transport and the mixer
//! borrow it per call; they never keep references across calls.

use crate::playback::PlaybackUnit;
use std::sync::Arc;
use stemdeck_core::{Result, StemDeckError, StemKey, DEFAULT_GAIN};
use tracing::{debug, info};

/// One stem and its mixer/transport state.
pub struct Stem {
    key: StemKey,
    pub(crate) unit: Box<dyn PlaybackUnit>,
    /// Encoded bytes for stems that have no upstream source (merge results).
    artifact: Option<Arc<[u8]>>,
    /// 0-100, written only by the channel mixer.
    pub(crate) gain: f32,
    /// Written only by the transport.
    pub(crate) is_playing: bool,
}

impl Stem {
    pub fn key(&self) -> &StemKey {
        &self.key
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Cursor of this stem's unit, in seconds.
    pub fn position(&self) -> f64 {
        self.unit.current_time()
    }

    pub fn duration(&self) -> f64 {
        self.unit.duration()
    }

    pub fn unit(&self) -> &dyn PlaybackUnit {
        self.unit.as_ref()
    }

    /// Encoded bytes held by the store, if this stem owns any.
    pub fn artifact(&self) -> Option<&[u8]> {
        self.artifact.as_deref()
    }
}

impl std::fmt::Debug for Stem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stem")
            .field("key", &self.key)
            .field("gain", &self.gain)
            .field("is_playing", &self.is_playing)
            .field("position", &self.position())
            .field("artifact_bytes", &self.artifact.as_ref().map(|a| a.len()))
            .finish()
    }
}

/// Ordered collection of stems. Iteration order is insertion order.
pub struct StemStore {
    stems: Vec<Stem>,
    default_gain: f32,
}

impl StemStore {
    pub fn new() -> Self {
        Self::with_default_gain(DEFAULT_GAIN)
    }

    /// Store whose new stems start at `gain` (clamped to 0-100).
    pub fn with_default_gain(gain: f32) -> Self {
        Self {
            stems: Vec::new(),
            default_gain: gain.clamp(0.0, 100.0),
        }
    }

    fn make_stem(&self, key: StemKey, mut unit: Box<dyn PlaybackUnit>, artifact: Option<Arc<[u8]>>) -> Stem {
        // A unit handed to the store starts from a clean state.
        unit.pause();
        unit.set_volume(self.default_gain / 100.0);
        Stem {
            key,
            unit,
            artifact,
            gain: self.default_gain,
            is_playing: false,
        }
    }

    /// Add a stem. Fails with `DuplicateKey` if the key is taken and with
    /// `InvalidParameter` if the key cannot name a file.
    pub fn add_stem(&mut self, key: StemKey, unit: Box<dyn PlaybackUnit>) -> Result<()> {
        key.validate()?;
        if self.contains(&key) {
            return Err(StemDeckError::DuplicateKey(key.to_string()));
        }
        debug!(key = %key, "Adding stem");
        let stem = self.make_stem(key, unit, None);
        self.stems.push(stem);
        Ok(())
    }

    /// Add or replace a stem that owns its encoded bytes.
    ///
    /// A replaced stem keeps its position in the strip order and its gain;
    /// its old unit is paused and released.
    pub fn replace_stem(
        &mut self,
        key: StemKey,
        unit: Box<dyn PlaybackUnit>,
        artifact: Option<Vec<u8>>,
    ) -> &Stem {
        let artifact = artifact.map(Arc::from);
        let index = match self.stems.iter().position(|s| s.key == key) {
            Some(index) => {
                let gain = self.stems[index].gain;
                let mut stem = self.make_stem(key, unit, artifact);
                stem.gain = gain;
                stem.unit.set_volume(gain / 100.0);
                let mut old = std::mem::replace(&mut self.stems[index], stem);
                old.unit.pause();
                info!(key = %old.key, "Released previous stem resource");
                index
            }
            None => {
                debug!(key = %key, "Adding stem");
                let stem = self.make_stem(key, unit, artifact);
                self.stems.push(stem);
                self.stems.len() - 1
            }
        };
        &self.stems[index]
    }

    /// Remove one stem, pausing its unit. The stem is handed back so the
    /// caller decides when it is released.
    pub fn remove(&mut self, key: &StemKey) -> Result<Stem> {
        let index = self
            .stems
            .iter()
            .position(|s| &s.key == key)
            .ok_or_else(|| StemDeckError::NotFound(key.to_string()))?;
        let mut stem = self.stems.remove(index);
        stem.unit.pause();
        stem.is_playing = false;
        Ok(stem)
    }

    /// Release every stem. Used when starting over with a new source track.
    pub fn remove_all(&mut self) {
        let count = self.stems.len();
        for stem in &mut self.stems {
            stem.unit.pause();
        }
        self.stems.clear();
        if count > 0 {
            info!(count, "Released all stems");
        }
    }

    pub fn get(&self, key: &StemKey) -> Result<&Stem> {
        self.stems
            .iter()
            .find(|s| &s.key == key)
            .ok_or_else(|| StemDeckError::NotFound(key.to_string()))
    }

    pub(crate) fn get_mut(&mut self, key: &StemKey) -> Result<&mut Stem> {
        self.stems
            .iter_mut()
            .find(|s| &s.key == key)
            .ok_or_else(|| StemDeckError::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &StemKey) -> bool {
        self.stems.iter().any(|s| &s.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stem> {
        self.stems.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Stem> {
        self.stems.iter_mut()
    }

    pub fn keys(&self) -> Vec<StemKey> {
        self.stems.iter().map(|s| s.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    pub fn default_gain(&self) -> f32 {
        self.default_gain
    }
}

impl Default for StemStore {
    fn default() -> Self {
        Self::new()
    }
}
