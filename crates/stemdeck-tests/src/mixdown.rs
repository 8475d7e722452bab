//! Merging stems end to end: source, decoder, sum, encoder, store.

use crate::fixtures::{deck, key, mono_wav, read_wav, song, wav, write_dir, RATE};
use stemdeck_audio::{MemoryPlaybackUnit, MergeError, MergeStatus, StemDeck};
use stemdeck_core::{DecodedAudio, DeckConfig, StemKey};
use stemdeck_media::MemoryStemSource;

#[tokio::test]
async fn merge_sums_mono_stems_into_stereo() {
    let mut source = MemoryStemSource::new();
    source.insert("drums", mono_wav(&[1.0, -1.0, 1.0, -1.0]));
    source.insert("bass", mono_wav(&[1.0, 1.0, 1.0, 1.0]));
    let mut deck = deck(source).await;

    deck.enter_merge_mode();
    deck.toggle_selection(&key("drums")).unwrap();
    deck.toggle_selection(&key("bass")).unwrap();
    let merged = deck.merge().await.unwrap();

    let (spec, samples) = read_wav(merged.artifact().unwrap());
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, RATE);
    assert_eq!(samples, vec![2.0, 2.0, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0]);
    assert!((merged.duration() - 4.0 / RATE as f64).abs() < 1e-12);
}

#[tokio::test]
async fn merged_stem_plays_with_the_rest() {
    let mut deck = deck(song()).await;
    deck.enter_merge_mode();
    deck.toggle_selection(&key("drums")).unwrap();
    deck.toggle_selection(&key("bass")).unwrap();
    deck.merge().await.unwrap();

    assert_eq!(
        deck.store().keys(),
        vec![key("drums"), key("bass"), key("vocals"), StemKey::merged()]
    );
    assert_eq!(deck.play_all(), 4);
    assert!(deck.stem(&StemKey::merged()).unwrap().is_playing());
}

#[tokio::test]
async fn stereo_and_mono_stems_mix() {
    let dir = tempfile::tempdir().unwrap();
    write_dir(
        dir.path(),
        &[
            ("other", wav(&[0.5, -0.5, 0.5, -0.5], 2)),
            ("piano", mono_wav(&[0.25, 0.25])),
        ],
    );
    let mut deck = StemDeck::open_dir(dir.path(), DeckConfig::default());
    assert_eq!(deck.load_all().await, vec![key("piano"), key("other")]);

    deck.enter_merge_mode();
    deck.toggle_selection(&key("other")).unwrap();
    deck.toggle_selection(&key("piano")).unwrap();
    let merged = deck.merge().await.unwrap();

    let (_, samples) = read_wav(merged.artifact().unwrap());
    assert_eq!(samples, vec![0.75, -0.25, 0.75, -0.25]);
}

#[tokio::test]
async fn failed_decode_leaves_store_alone() {
    let mut source = song();
    source.insert("vocals", b"corrupt".to_vec());
    let mut deck = deck(source).await;
    assert!(!deck.store().contains(&key("vocals")));

    // A vocals unit loaded before the file went bad.
    let audio = DecodedAudio::mono(RATE, vec![0.3; 4]);
    deck.add_stem(key("vocals"), Box::new(MemoryPlaybackUnit::from_decoded(&audio)))
        .unwrap();

    let before = deck.store().keys();
    deck.enter_merge_mode();
    deck.toggle_selection(&key("drums")).unwrap();
    deck.toggle_selection(&key("vocals")).unwrap();

    let err = deck.merge().await.unwrap_err();
    assert!(matches!(err, MergeError::DecodeFailed { ref key, .. } if key.as_str() == "vocals"));
    assert_eq!(deck.store().keys(), before);
    assert!(matches!(deck.merge_status(), MergeStatus::Failed(_)));
    assert_eq!(deck.selected_keys(), vec![key("drums"), key("vocals")]);
}

#[tokio::test]
async fn empty_selection_is_rejected() {
    let mut deck = deck(song()).await;
    let events = deck.subscribe();
    deck.enter_merge_mode();
    let _ = events.try_iter().count();

    assert_eq!(deck.merge().await.unwrap_err(), MergeError::EmptySelection);
    assert_eq!(events.try_iter().count(), 0);
    assert_eq!(deck.merge_status(), &MergeStatus::Idle);
}
