//! Transport and mixer behavior through the deck.

use crate::fixtures::{deck, key, song};
use std::time::Duration;
use stemdeck_audio::{DeckEvent, TransportState};

#[tokio::test]
async fn stop_all_rewinds_everything() {
    let mut deck = deck(song()).await;
    deck.play_all();
    deck.tick(Duration::from_millis(300));
    assert!(deck.playhead() > 0.0);

    deck.stop_all();
    assert_eq!(deck.playhead(), 0.0);
    assert_eq!(deck.transport_state(), TransportState::Stopped);
    for stem in deck.store().iter() {
        assert!(!stem.is_playing());
        assert_eq!(stem.position(), 0.0);
    }
}

#[tokio::test]
async fn play_after_pause_resumes_in_place() {
    let mut deck = deck(song()).await;
    deck.play_all();
    deck.tick(Duration::from_millis(250));
    deck.pause_all();
    assert_eq!(deck.transport_state(), TransportState::Paused);
    assert!((deck.playhead() - 0.25).abs() < 1e-9);

    deck.play_all();
    for stem in deck.store().iter() {
        assert!(stem.is_playing());
        assert!((stem.position() - 0.25).abs() < 1e-9);
    }
}

#[tokio::test]
async fn toggle_play_previews_one_stem() {
    let mut deck = deck(song()).await;
    assert!(deck.toggle_play(&key("drums")).unwrap());

    let playing: Vec<bool> = deck.store().iter().map(|s| s.is_playing()).collect();
    assert_eq!(playing, [true, false, false]);

    deck.tick(Duration::from_millis(500));
    assert!((deck.playhead() - 0.5).abs() < 1e-9);
    assert_eq!(deck.stem(&key("bass")).unwrap().position(), 0.0);
}

#[tokio::test]
async fn stems_end_independently() {
    let mut deck = deck(song()).await;
    deck.play_all();
    deck.tick(Duration::from_millis(1500));

    assert!(!deck.is_any_playing());
    assert_eq!(deck.transport_state(), TransportState::Paused);
}

#[tokio::test]
async fn gain_is_clamped_and_metered() {
    let mut deck = deck(song()).await;
    assert_eq!(deck.set_gain(&key("vocals"), -10.0).unwrap(), 0.0);
    assert_eq!(deck.set_gain(&key("vocals"), 140.0).unwrap(), 100.0);

    assert_eq!(deck.meter_level(&key("vocals")).unwrap(), 0.0);
    deck.play_all();
    let level = deck.meter_level(&key("vocals")).unwrap();
    assert!((80.0..=100.0).contains(&level));
}

#[tokio::test]
async fn observers_see_playback_changes() {
    let mut deck = deck(song()).await;
    let events = deck.subscribe();
    deck.toggle_play(&key("bass")).unwrap();

    let seen: Vec<DeckEvent> = events.try_iter().collect();
    assert_eq!(
        seen,
        vec![
            DeckEvent::PlaybackChanged {
                key: key("bass"),
                playing: true
            },
            DeckEvent::TransportChanged(TransportState::Playing),
        ]
    );
}
