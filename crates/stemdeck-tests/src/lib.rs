//! Integration test crate for StemDeck.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It wires real sources, the symphonia decoder and the WAV encoder into
//! the deck to check they work together.

#[cfg(test)]
mod fixtures;

#[cfg(test)]
mod transport;

#[cfg(test)]
mod mixdown;

#[cfg(test)]
mod export;
