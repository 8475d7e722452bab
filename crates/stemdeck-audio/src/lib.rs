//! StemDeck Audio - Multi-stem playback engine
//!
//! Plays the separated stems of a song as one recording and merges
//! selections of them into new stems.
//!
//! Architecture:
//! - `StemStore`: Owns every stem's playback unit and merge artifact
//! - `Transport`: Play/pause/stop over all stems with one shared playhead
//! - `ChannelMixer`: Per-stem gain, synthetic meters, summing into the output
//! - `RingBuffer`: Lock-free SPSC buffer between the mixer and the device callback
//! - `MixdownEngine`: Decodes, sums and encodes a selection of stems
//! - `StemDeck`: Top-level orchestrator with event subscriptions

pub mod deck;
pub mod events;
pub mod mixdown;
pub mod mixer;
#[cfg(feature = "device-output")]
pub mod output;
pub mod playback;
pub mod ring_buffer;
pub mod store;
pub mod transport;

pub use deck::StemDeck;
pub use events::{DeckEvent, EventBus};
pub use mixdown::{sum_to_stereo, MergeError, MergeOutput, MergeSession, MergeStatus, MixdownEngine};
pub use mixer::{clamp_gain, ChannelMixer};
#[cfg(feature = "device-output")]
pub use output::DeviceOutput;
pub use playback::{MemoryPlaybackUnit, PlaybackUnit};
pub use ring_buffer::RingBuffer;
pub use store::{Stem, StemStore};
pub use transport::{Transport, TransportState};
