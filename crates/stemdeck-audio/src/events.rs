//! Deck events for observers.
//!
//! The deck owns all state; views subscribe and get a copy of every change.

use crate::mixdown::MergeStatus;
use crate::transport::TransportState;
use crossbeam_channel::{unbounded, Receiver, Sender};
use stemdeck_core::StemKey;

/// A change in deck state.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckEvent {
    StemAdded(StemKey),
    /// A merge result replaced the previous one under the same key.
    StemReplaced(StemKey),
    StemRemoved(StemKey),
    StemsCleared,
    PlaybackChanged { key: StemKey, playing: bool },
    TransportChanged(TransportState),
    /// Shared playhead in seconds.
    PlayheadMoved(f64),
    GainChanged { key: StemKey, gain: f32 },
    MergeModeChanged(bool),
    SelectionChanged(Vec<StemKey>),
    MergeStatusChanged(MergeStatus),
}

/// Fan-out of deck events to any number of subscribers.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<DeckEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// New receiver that sees every event emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<DeckEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Send to every live subscriber. Dropped receivers are forgotten.
    pub fn emit(&mut self, event: DeckEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
