//! Exporting stems to disk.

use crate::fixtures::{deck, key, mono_wav, read_wav, song, write_dir};
use stemdeck_media::{export_all, DirectoryStemSource, StemSource};

#[tokio::test]
async fn directory_export_follows_strip_order() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_dir(
        src.path(),
        &[
            ("vocals", mono_wav(&[0.1; 8])),
            ("drums", mono_wav(&[0.2; 8])),
            ("merged", mono_wav(&[0.3; 8])),
        ],
    );
    let source = DirectoryStemSource::new(src.path());
    let keys = source.keys();
    assert_eq!(keys, vec![key("drums"), key("vocals")]);

    let report = export_all(&source, &keys, out.path()).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(
        report.written,
        vec![out.path().join("drums.wav"), out.path().join("vocals.wav")]
    );
    assert_eq!(
        std::fs::read(out.path().join("drums.wav")).unwrap(),
        std::fs::read(src.path().join("drums.wav")).unwrap()
    );
}

#[tokio::test]
async fn missing_stems_do_not_stop_the_batch() {
    let out = tempfile::tempdir().unwrap();
    let source = song();
    let keys = vec![key("drums"), key("piano"), key("vocals")];

    let report = export_all(&source, &keys, out.path()).await.unwrap();
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.skipped, vec![key("piano")]);
    assert!(!report.is_complete());
}

#[tokio::test]
async fn deck_export_writes_merge_result() {
    let out = tempfile::tempdir().unwrap();
    let mut deck = deck(song()).await;
    deck.enter_merge_mode();
    deck.toggle_selection(&key("bass")).unwrap();
    deck.toggle_selection(&key("vocals")).unwrap();
    deck.merge().await.unwrap();

    let path = deck
        .export_stem(&stemdeck_core::StemKey::merged(), out.path())
        .await
        .unwrap();
    assert_eq!(path, out.path().join("merged.wav"));

    let (spec, samples) = read_wav(&std::fs::read(&path).unwrap());
    assert_eq!(spec.channels, 2);
    assert!(samples.iter().all(|&s| (s - 0.5).abs() < 1e-6));
}
