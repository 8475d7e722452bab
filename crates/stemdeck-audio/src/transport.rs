//! Transport controller.
//!
//! Drives every stem's playback unit as one logical player with a single
//! shared playhead. Synchronization is best effort: batch operations touch
//! the units one after another in store order, and the playhead is sampled
//! from a playing unit on a fixed cadence. Units may drift apart by up to a
//! polling interval; only `play_all` re-aligns them.

use crate::store::StemStore;
use serde::{Deserialize, Serialize};
use stemdeck_core::{Result, StemKey};
use tracing::{debug, warn};

/// Transport state over the whole track set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    /// Like `Stopped`, but the playhead is kept.
    Paused,
}

/// Shared transport for all stems in a store.
#[derive(Debug, Default)]
pub struct Transport {
    state: TransportState,
    playhead: f64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Shared playhead in seconds.
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// Seek every unit to the playhead, then start it.
    ///
    /// Units that refuse to start are skipped. Returns how many started.
    pub fn play_all(&mut self, store: &mut StemStore) -> usize {
        let mut started = 0;
        for stem in store.iter_mut() {
            stem.unit.seek(self.playhead);
            match stem.unit.play() {
                Ok(()) => {
                    stem.is_playing = true;
                    started += 1;
                }
                Err(e) => {
                    warn!(key = %stem.key(), error = %e, "Stem failed to start");
                    stem.is_playing = false;
                }
            }
        }
        if started > 0 {
            self.state = TransportState::Playing;
        }
        debug!(started, playhead = self.playhead, "Play all");
        started
    }

    /// Pause every unit, keeping positions.
    pub fn pause_all(&mut self, store: &mut StemStore) {
        // Take a fresh reading so resuming starts where playback actually was.
        self.sample_playhead(store);
        for stem in store.iter_mut() {
            stem.unit.pause();
            stem.is_playing = false;
        }
        self.state = TransportState::Paused;
        debug!(playhead = self.playhead, "Pause all");
    }

    /// Pause every unit and rewind everything to 0.
    pub fn stop_all(&mut self, store: &mut StemStore) {
        for stem in store.iter_mut() {
            stem.unit.pause();
            stem.unit.seek(0.0);
            stem.is_playing = false;
        }
        self.playhead = 0.0;
        self.state = TransportState::Stopped;
        debug!("Stop all");
    }

    /// Start or stop one stem on its own, without touching the others or
    /// seeking. Returns the stem's new playing flag.
    pub fn toggle_play(&mut self, store: &mut StemStore, key: &StemKey) -> Result<bool> {
        let stem = store.get_mut(key)?;
        if stem.is_playing {
            stem.unit.pause();
            stem.is_playing = false;
        } else {
            match stem.unit.play() {
                Ok(()) => stem.is_playing = true,
                Err(e) => warn!(key = %key, error = %e, "Stem failed to start"),
            }
        }
        let playing = stem.is_playing;
        self.refresh_state(store);
        Ok(playing)
    }

    /// Read the playhead from the first playing unit in store order.
    ///
    /// Returns the new value if a unit was playing.
    pub fn sample_playhead(&mut self, store: &StemStore) -> Option<f64> {
        let position = store.iter().find(|s| s.is_playing)?.position();
        self.playhead = position;
        Some(position)
    }

    /// Clear the playing flag of units that finished on their own.
    ///
    /// Siblings keep playing. Returns the keys that ended.
    pub fn collect_ended(&mut self, store: &mut StemStore) -> Vec<StemKey> {
        let mut ended = Vec::new();
        for stem in store.iter_mut() {
            if stem.unit.take_ended() {
                stem.is_playing = false;
                ended.push(stem.key().clone());
            }
        }
        if !ended.is_empty() {
            debug!(?ended, "Stems reached their end");
            self.refresh_state(store);
        }
        ended
    }

    /// Forget the transport position, e.g. after the store was emptied.
    pub fn reset(&mut self) {
        self.state = TransportState::Stopped;
        self.playhead = 0.0;
    }

    pub fn is_any_playing(store: &StemStore) -> bool {
        store.iter().any(|s| s.is_playing)
    }

    fn refresh_state(&mut self, store: &StemStore) {
        if Self::is_any_playing(store) {
            self.state = TransportState::Playing;
        } else if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{MemoryPlaybackUnit, PlaybackUnit};
    use stemdeck_core::DecodedAudio;

    /// 10 Hz mono stems so one frame is 0.1 s.
    fn store_with(keys: &[&str], frames: usize) -> StemStore {
        let mut store = StemStore::new();
        for key in keys {
            let unit = MemoryPlaybackUnit::from_decoded(&DecodedAudio::mono(10, vec![0.1; frames]));
            store.add_stem(StemKey::from(*key), Box::new(unit)).unwrap();
        }
        store
    }

    fn advance(store: &mut StemStore, frames: usize) {
        let mut scratch = vec![0.0f32; frames * 2];
        for stem in store.iter_mut() {
            scratch.fill(0.0);
            stem.unit.render(&mut scratch);
        }
    }

    #[test]
    fn test_play_all_starts_every_unit() {
        let mut store = store_with(&["drums", "bass"], 100);
        let mut transport = Transport::new();
        assert_eq!(transport.play_all(&mut store), 2);
        assert_eq!(transport.state(), TransportState::Playing);
        assert!(store.iter().all(|s| s.is_playing() && s.unit().is_playing()));
    }

    #[test]
    fn test_play_all_realigns_units() {
        let mut store = store_with(&["drums", "bass"], 100);
        let mut transport = Transport::new();

        transport.toggle_play(&mut store, &StemKey::from("drums")).unwrap();
        advance(&mut store, 30);
        transport.sample_playhead(&store);
        assert!((transport.playhead() - 3.0).abs() < 1e-9);

        transport.play_all(&mut store);
        for stem in store.iter() {
            assert!((stem.position() - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_stop_all_resets_playhead() {
        let mut store = store_with(&["drums", "bass"], 100);
        let mut transport = Transport::new();
        transport.play_all(&mut store);
        advance(&mut store, 20);
        transport.sample_playhead(&store);

        transport.stop_all(&mut store);
        assert_eq!(transport.playhead(), 0.0);
        assert_eq!(transport.state(), TransportState::Stopped);
        for stem in store.iter() {
            assert!(!stem.is_playing());
            assert_eq!(stem.position(), 0.0);
        }
    }

    #[test]
    fn test_pause_then_play_resumes_from_same_position() {
        let mut store = store_with(&["drums", "bass", "vocals"], 100);
        let mut transport = Transport::new();
        transport.play_all(&mut store);
        advance(&mut store, 25);

        transport.pause_all(&mut store);
        assert_eq!(transport.state(), TransportState::Paused);
        assert!((transport.playhead() - 2.5).abs() < 1e-9);

        transport.play_all(&mut store);
        for stem in store.iter() {
            assert!((stem.position() - 2.5).abs() < 1e-9);
            assert!(stem.is_playing());
        }
    }

    #[test]
    fn test_toggle_play_only_touches_one_stem() {
        let mut store = store_with(&["drums", "bass"], 100);
        let mut transport = Transport::new();

        assert!(transport.toggle_play(&mut store, &StemKey::from("drums")).unwrap());
        assert!(store.get(&StemKey::from("drums")).unwrap().is_playing());
        assert!(!store.get(&StemKey::from("bass")).unwrap().is_playing());
        assert_eq!(transport.state(), TransportState::Playing);

        advance(&mut store, 7);
        assert_eq!(transport.sample_playhead(&store), Some(0.7));

        assert!(!transport.toggle_play(&mut store, &StemKey::from("drums")).unwrap());
        assert_eq!(transport.state(), TransportState::Paused);
    }

    #[test]
    fn test_toggle_unknown_key() {
        let mut store = store_with(&["drums"], 10);
        let mut transport = Transport::new();
        assert!(transport.toggle_play(&mut store, &StemKey::from("bass")).is_err());
    }

    #[test]
    fn test_failed_unit_does_not_abort_batch() {
        let mut store = store_with(&["drums"], 10);
        store
            .add_stem(
                StemKey::from("broken"),
                Box::new(MemoryPlaybackUnit::from_interleaved(Vec::new(), 10)),
            )
            .unwrap();
        store
            .add_stem(
                StemKey::from("bass"),
                Box::new(MemoryPlaybackUnit::from_decoded(&DecodedAudio::mono(10, vec![0.0; 10]))),
            )
            .unwrap();

        let mut transport = Transport::new();
        assert_eq!(transport.play_all(&mut store), 2);
        assert!(!store.get(&StemKey::from("broken")).unwrap().is_playing());
        assert!(store.get(&StemKey::from("bass")).unwrap().is_playing());
    }

    #[test]
    fn test_ended_stem_does_not_stop_siblings() {
        let mut store = store_with(&["drums"], 100);
        store
            .add_stem(
                StemKey::from("short"),
                Box::new(MemoryPlaybackUnit::from_decoded(&DecodedAudio::mono(10, vec![0.0; 5]))),
            )
            .unwrap();
        let mut transport = Transport::new();
        transport.play_all(&mut store);
        advance(&mut store, 10);

        assert_eq!(transport.collect_ended(&mut store), vec![StemKey::from("short")]);
        assert!(!store.get(&StemKey::from("short")).unwrap().is_playing());
        assert!(store.get(&StemKey::from("drums")).unwrap().is_playing());
        assert_eq!(transport.state(), TransportState::Playing);
    }

    #[test]
    fn test_playhead_not_sampled_when_idle() {
        let store = store_with(&["drums"], 10);
        let mut transport = Transport::new();
        assert_eq!(transport.sample_playhead(&store), None);
        assert_eq!(transport.playhead(), 0.0);
    }
}
