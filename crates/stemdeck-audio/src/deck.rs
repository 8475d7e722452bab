//! The stem deck.
//!
//! `StemDeck` ties the store, transport, mixer and mixdown engine together
//! behind the operations a player view needs, and reports every state
//! change to its subscribers.

use crate::events::{DeckEvent, EventBus};
use crate::mixdown::{MergeError, MergeSession, MergeStatus, MixdownEngine};
use crate::mixer::ChannelMixer;
use crate::playback::{MemoryPlaybackUnit, PlaybackUnit};
use crate::ring_buffer::RingBuffer;
use crate::store::{Stem, StemStore};
use crate::transport::{Transport, TransportState};
use crossbeam_channel::Receiver;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stemdeck_core::{seconds_to_frames, DeckConfig, Result, StemDeckError, StemKey};
use stemdeck_media::{
    write_stem, AudioDecoder, AudioEncoder, DirectoryStemSource, ExportReport, MediaError, MediaResult,
    StemSource, SymphoniaDecoder, WavEncoder,
};
use tracing::{debug, info, warn};

/// Multi-stem player with a shared transport and a mixdown engine.
pub struct StemDeck<S = DirectoryStemSource, D = SymphoniaDecoder, E = WavEncoder> {
    config: DeckConfig,
    source: S,
    engine: MixdownEngine<D, E>,
    store: StemStore,
    transport: Transport,
    mixer: ChannelMixer,
    session: Option<MergeSession>,
    merge_status: MergeStatus,
    events: EventBus,
    output: Option<Arc<RingBuffer>>,
}

impl StemDeck {
    /// Deck over `<dir>/<key>.wav` files with the default decoder and a
    /// float WAV encoder.
    pub fn open_dir(dir: impl Into<PathBuf>, config: DeckConfig) -> Self {
        Self::new(
            DirectoryStemSource::new(dir),
            SymphoniaDecoder::new(),
            WavEncoder::default(),
            config,
        )
    }
}

impl<S: StemSource, D: AudioDecoder, E: AudioEncoder> StemDeck<S, D, E> {
    pub fn new(source: S, decoder: D, encoder: E, config: DeckConfig) -> Self {
        let engine = MixdownEngine::with_sample_rate(decoder, encoder, config.target_sample_rate);
        Self {
            store: StemStore::with_default_gain(config.default_gain),
            mixer: ChannelMixer::new(&config),
            transport: Transport::new(),
            session: None,
            merge_status: MergeStatus::Idle,
            events: EventBus::new(),
            output: None,
            source,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &DeckConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Receive every state change from now on.
    pub fn subscribe(&mut self) -> Receiver<DeckEvent> {
        self.events.subscribe()
    }

    // ---- Store ----

    /// Fetch, decode and add each key. Stems that are already loaded, have
    /// no data or fail to decode are skipped. Returns the keys added.
    pub async fn load_stems(&mut self, keys: &[StemKey]) -> Vec<StemKey> {
        let mut loaded = Vec::new();
        for key in keys {
            if self.store.contains(key) {
                debug!(key = %key, "Stem already loaded");
                continue;
            }
            let bytes = match self.source.fetch(key).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    warn!(key = %key, "No data for stem, not loading it");
                    continue;
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to fetch stem");
                    continue;
                }
            };
            let audio = match self.engine.decoder().decode(&bytes) {
                Ok(audio) => audio,
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to decode stem");
                    continue;
                }
            };
            if audio.sample_rate != self.config.target_sample_rate {
                warn!(
                    key = %key,
                    sample_rate = audio.sample_rate,
                    target = self.config.target_sample_rate,
                    "Stem sample rate differs from the deck rate"
                );
            }
            let unit = MemoryPlaybackUnit::from_decoded(&audio);
            match self.add_stem(key.clone(), Box::new(unit)) {
                Ok(()) => loaded.push(key.clone()),
                Err(e) => warn!(key = %key, error = %e, "Failed to add stem"),
            }
        }
        info!(loaded = loaded.len(), requested = keys.len(), "Stems loaded");
        loaded
    }

    /// Load every stem the source offers.
    pub async fn load_all(&mut self) -> Vec<StemKey> {
        let keys = self.source.keys();
        self.load_stems(&keys).await
    }

    /// Add a stem with an already built playback unit.
    pub fn add_stem(&mut self, key: StemKey, unit: Box<dyn PlaybackUnit>) -> Result<()> {
        self.store.add_stem(key.clone(), unit)?;
        self.events.emit(DeckEvent::StemAdded(key));
        Ok(())
    }

    /// Discard one stem. A playing stem is stopped first and a selected
    /// one leaves the merge selection.
    pub fn remove_stem(&mut self, key: &StemKey) -> Result<()> {
        self.stop_stem(key)?;
        let stem = self.store.remove(key)?;
        if let Some(session) = self.session.as_mut() {
            if session.is_selected(key) {
                session.toggle(key);
                let keys = session.selected().to_vec();
                self.events.emit(DeckEvent::SelectionChanged(keys));
            }
        }
        info!(key = %stem.key(), "Stem removed");
        self.events.emit(DeckEvent::StemRemoved(key.clone()));
        Ok(())
    }

    /// Release every stem and start over: transport stopped, merge session
    /// and status discarded.
    pub fn reset(&mut self) {
        self.transport.stop_all(&mut self.store);
        self.store.remove_all();
        self.transport.reset();
        self.session = None;
        self.merge_status = MergeStatus::Idle;
        if let Some(ring) = &self.output {
            ring.clear();
        }
        info!("Deck reset");
        self.events.emit(DeckEvent::StemsCleared);
        self.events.emit(DeckEvent::TransportChanged(TransportState::Stopped));
        self.events.emit(DeckEvent::MergeModeChanged(false));
        self.events.emit(DeckEvent::MergeStatusChanged(MergeStatus::Idle));
    }

    pub fn store(&self) -> &StemStore {
        &self.store
    }

    pub fn stem(&self, key: &StemKey) -> Result<&Stem> {
        self.store.get(key)
    }

    // ---- Transport ----

    pub fn play_all(&mut self) -> usize {
        let before = self.playing_flags();
        let started = self.transport.play_all(&mut self.store);
        self.emit_transport_changes(before);
        started
    }

    pub fn pause_all(&mut self) {
        let before = self.playing_flags();
        self.transport.pause_all(&mut self.store);
        if let Some(ring) = &self.output {
            ring.clear();
        }
        self.emit_transport_changes(before);
    }

    pub fn stop_all(&mut self) {
        let before = self.playing_flags();
        self.transport.stop_all(&mut self.store);
        if let Some(ring) = &self.output {
            ring.clear();
        }
        self.emit_transport_changes(before);
        self.events.emit(DeckEvent::PlayheadMoved(0.0));
    }

    /// Solo-preview one stem. Returns its new playing flag.
    pub fn toggle_play(&mut self, key: &StemKey) -> Result<bool> {
        let before = self.playing_flags();
        let playing = self.transport.toggle_play(&mut self.store, key)?;
        self.emit_transport_changes(before);
        Ok(playing)
    }

    /// Stop one stem through the transport if it is playing.
    fn stop_stem(&mut self, key: &StemKey) -> Result<()> {
        if !self.store.get(key)?.is_playing() {
            return Ok(());
        }
        let before = self.playing_flags();
        let result = self.transport.toggle_play(&mut self.store, key);
        self.emit_transport_changes(before);
        result.map(|_| ())
    }

    pub fn is_any_playing(&self) -> bool {
        Transport::is_any_playing(&self.store)
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Shared playhead in seconds, as of the last sample.
    pub fn playhead(&self) -> f64 {
        self.transport.playhead()
    }

    /// Advance playback by one polling step.
    ///
    /// With a device output attached, as many frames are rendered as the
    /// ring has room for; otherwise `elapsed` worth of frames is rendered
    /// and discarded. Then finished stems are collected and the shared
    /// playhead is re-sampled. Returns the playhead.
    pub fn tick(&mut self, elapsed: Duration) -> f64 {
        if !self.is_any_playing() {
            return self.transport.playhead();
        }
        let frames = match &self.output {
            Some(ring) => ring.available_write() / 2,
            None => self.frames_for(elapsed),
        };
        let before = self.playing_flags();
        self.mixer.render(&mut self.store, frames, self.output.as_deref());
        self.transport.collect_ended(&mut self.store);
        if let Some(position) = self.transport.sample_playhead(&self.store) {
            self.events.emit(DeckEvent::PlayheadMoved(position));
        }
        self.emit_transport_changes(before);
        self.transport.playhead()
    }

    /// Frames to render headless for `elapsed`, capped at what the longest
    /// playing stem has left plus one so that it reaches its end.
    fn frames_for(&self, elapsed: Duration) -> usize {
        let rate = self.config.target_sample_rate;
        let remaining = self
            .store
            .iter()
            .filter(|s| s.is_playing())
            .map(|s| (s.duration() - s.position()).max(0.0))
            .fold(0.0, f64::max);
        let seconds = elapsed.as_secs_f64();
        if seconds < remaining {
            seconds_to_frames(seconds, rate)
        } else {
            seconds_to_frames(remaining, rate).saturating_add(1)
        }
    }

    /// Create the ring buffer the mixer renders into and a device output
    /// reads from. Calling it again returns the same ring.
    pub fn attach_output(&mut self) -> Arc<RingBuffer> {
        let capacity = self.config.output_buffer_samples().max(2);
        Arc::clone(
            self.output
                .get_or_insert_with(|| Arc::new(RingBuffer::new(capacity))),
        )
    }

    /// Stop rendering into the ring buffer. Queued samples are dropped and
    /// later ticks run headless.
    pub fn detach_output(&mut self) {
        if let Some(ring) = self.output.take() {
            ring.clear();
            debug!("Output detached");
        }
    }

    fn playing_flags(&self) -> (TransportState, Vec<(StemKey, bool)>) {
        let flags = self
            .store
            .iter()
            .map(|s| (s.key().clone(), s.is_playing()))
            .collect();
        (self.transport.state(), flags)
    }

    fn emit_transport_changes(&mut self, (state, flags): (TransportState, Vec<(StemKey, bool)>)) {
        for (key, was_playing) in flags {
            let Ok(stem) = self.store.get(&key) else {
                continue;
            };
            if stem.is_playing() != was_playing {
                let playing = stem.is_playing();
                self.events.emit(DeckEvent::PlaybackChanged { key, playing });
            }
        }
        if self.transport.state() != state {
            self.events
                .emit(DeckEvent::TransportChanged(self.transport.state()));
        }
    }

    // ---- Mixer ----

    /// Set a stem's gain (clamped to 0-100). Returns the stored value.
    pub fn set_gain(&mut self, key: &StemKey, value: f32) -> Result<f32> {
        let gain = self.mixer.set_gain(&mut self.store, key, value)?;
        self.events.emit(DeckEvent::GainChanged {
            key: key.clone(),
            gain,
        });
        Ok(gain)
    }

    pub fn gain(&self, key: &StemKey) -> Result<f32> {
        Ok(self.store.get(key)?.gain())
    }

    /// Synthetic meter reading, 0-100. See [`ChannelMixer::meter_level`].
    pub fn meter_level(&self, key: &StemKey) -> Result<f32> {
        self.mixer.meter_level(&self.store, key)
    }

    // ---- Merge ----

    /// Start choosing stems to merge. A session already open is kept.
    pub fn enter_merge_mode(&mut self) {
        if self.session.is_some() {
            return;
        }
        let session = MergeSession::new();
        debug!(session = %session.id(), "Entered merge mode");
        self.session = Some(session);
        self.events.emit(DeckEvent::MergeModeChanged(true));
        self.set_merge_status(MergeStatus::Idle);
    }

    /// Leave merge mode, dropping the selection and any failure message.
    pub fn exit_merge_mode(&mut self) {
        if self.session.take().is_none() {
            return;
        }
        debug!("Left merge mode");
        self.events.emit(DeckEvent::MergeModeChanged(false));
        self.events.emit(DeckEvent::SelectionChanged(Vec::new()));
        if matches!(self.merge_status, MergeStatus::Failed(_)) {
            self.set_merge_status(MergeStatus::Idle);
        }
    }

    pub fn is_merge_mode(&self) -> bool {
        self.session.is_some()
    }

    /// Flip a stem's merge selection and return whether it is now
    /// selected.
    ///
    /// Outside merge mode, and for the merge result itself, this does
    /// nothing and returns `false`.
    pub fn toggle_selection(&mut self, key: &StemKey) -> Result<bool> {
        if !self.store.contains(key) {
            return Err(StemDeckError::NotFound(key.to_string()));
        }
        let Some(session) = self.session.as_mut() else {
            debug!(key = %key, "Selection ignored outside merge mode");
            return Ok(false);
        };
        if key.is_merged() {
            debug!("The merge result cannot be selected");
            return Ok(false);
        }
        let selected = session.toggle(key);
        let keys = session.selected().to_vec();
        self.events.emit(DeckEvent::SelectionChanged(keys));
        Ok(selected)
    }

    pub fn is_selected(&self, key: &StemKey) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_selected(key))
    }

    pub fn selected_keys(&self) -> Vec<StemKey> {
        self.session
            .as_ref()
            .map(|s| s.selected().to_vec())
            .unwrap_or_default()
    }

    pub fn merge_status(&self) -> &MergeStatus {
        &self.merge_status
    }

    /// Merge the selected stems into the `"merged"` stem.
    ///
    /// On success the previous merge result is released and replaced, and
    /// merge mode exits. On failure the store is untouched, merge mode and
    /// the selection stay so the user can retry, and the status holds the
    /// error until [`dismiss_merge_error`](Self::dismiss_merge_error).
    pub async fn merge(&mut self) -> std::result::Result<&Stem, MergeError> {
        if self.engine.is_merging() {
            return Err(MergeError::AlreadyInProgress);
        }
        let keys = self.selected_keys();
        if keys.is_empty() {
            return Err(MergeError::EmptySelection);
        }

        self.set_merge_status(MergeStatus::Merging);
        let output = match self.engine.merge(&self.source, &keys).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Merge failed");
                self.set_merge_status(MergeStatus::Failed(e.to_string()));
                return Err(e);
            }
        };

        let key = StemKey::merged();
        let replaced = self.store.contains(&key);
        if replaced {
            // The old result is about to be released.
            if let Err(e) = self.stop_stem(&key) {
                warn!(key = %key, error = %e, "Failed to stop previous merge result");
            }
        }
        info!(sources = ?output.sources, replaced, "Storing merge result");

        self.session = None;
        self.events.emit(if replaced {
            DeckEvent::StemReplaced(key.clone())
        } else {
            DeckEvent::StemAdded(key.clone())
        });
        self.events.emit(DeckEvent::SelectionChanged(Vec::new()));
        self.events.emit(DeckEvent::MergeModeChanged(false));
        self.set_merge_status(MergeStatus::Complete);

        let unit = MemoryPlaybackUnit::from_decoded(&output.mix);
        Ok(self.store.replace_stem(key, Box::new(unit), Some(output.bytes)))
    }

    /// Clear a failure message after it has been shown.
    pub fn dismiss_merge_error(&mut self) {
        if matches!(self.merge_status, MergeStatus::Failed(_)) {
            self.set_merge_status(MergeStatus::Idle);
        }
    }

    fn set_merge_status(&mut self, status: MergeStatus) {
        if self.merge_status != status {
            self.merge_status = status.clone();
            self.events.emit(DeckEvent::MergeStatusChanged(status));
        }
    }

    // ---- Export ----

    /// Encoded bytes of a stem: the stored artifact for a merge result,
    /// otherwise whatever the source has.
    pub async fn artifact_bytes(&self, key: &StemKey) -> MediaResult<Option<Vec<u8>>> {
        if let Ok(stem) = self.store.get(key) {
            if let Some(bytes) = stem.artifact() {
                return Ok(Some(bytes.to_vec()));
            }
        }
        self.source.fetch(key).await
    }

    /// Write one stem to `<dir>/<key>.<ext>`. A merge result takes the
    /// encoder's extension; other stems keep the source's.
    pub async fn export_stem(&self, key: &StemKey, dir: &Path) -> MediaResult<PathBuf> {
        let owned = self.store.get(key).ok().and_then(|s| s.artifact());
        let (bytes, extension) = match owned {
            Some(bytes) => (bytes.to_vec(), self.engine.encoder().extension()),
            None => {
                let bytes = self
                    .source
                    .fetch(key)
                    .await?
                    .ok_or_else(|| MediaError::MissingStem(key.to_string()))?;
                (bytes, self.source.extension())
            }
        };
        write_stem(dir, key, extension, &bytes).await
    }

    /// Export every loaded stem, merge result included, one after another
    /// in channel-strip order. A failing stem does not stop the rest.
    pub async fn export_all(&self, dir: &Path) -> MediaResult<ExportReport> {
        tokio::fs::create_dir_all(dir).await?;
        let mut report = ExportReport::default();
        for key in self.store.keys() {
            match self.export_stem(&key, dir).await {
                Ok(path) => report.written.push(path),
                Err(MediaError::MissingStem(_)) => {
                    warn!(key = %key, "No data for stem, skipping export");
                    report.skipped.push(key);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to export stem");
                    report.failed.push((key, e.to_string()));
                }
            }
        }
        info!(
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Deck export finished"
        );
        Ok(report)
    }
}
