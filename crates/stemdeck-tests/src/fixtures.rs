//! Shared stem fixtures.

use std::io::Cursor;
use std::path::Path;
use stemdeck_audio::StemDeck;
use stemdeck_core::{DeckConfig, StemKey};
use stemdeck_media::{MemoryStemSource, SymphoniaDecoder, WavEncoder};

pub const RATE: u32 = 44_100;

/// Mono float WAV.
pub fn mono_wav(samples: &[f32]) -> Vec<u8> {
    wav(samples, 1)
}

/// Interleaved float WAV with `channels` channels.
pub fn wav(samples: &[f32], channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut bytes = Vec::new();
    let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
    bytes
}

/// Read back every sample of a float WAV.
pub fn read_wav(bytes: &[u8]) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

/// One second of each of drums, bass and vocals at a constant level.
pub fn song() -> MemoryStemSource {
    let mut source = MemoryStemSource::new();
    source.insert("drums", mono_wav(&vec![0.1; RATE as usize]));
    source.insert("bass", mono_wav(&vec![0.2; RATE as usize]));
    source.insert("vocals", mono_wav(&vec![0.3; RATE as usize]));
    source
}

pub fn write_dir(dir: &Path, stems: &[(&str, Vec<u8>)]) {
    for (key, bytes) in stems {
        std::fs::write(dir.join(format!("{key}.wav")), bytes).unwrap();
    }
}

pub async fn deck(source: MemoryStemSource) -> StemDeck<MemoryStemSource> {
    let mut deck = StemDeck::new(
        source,
        SymphoniaDecoder::new(),
        WavEncoder::default(),
        DeckConfig::default(),
    );
    deck.load_all().await;
    deck
}

pub fn key(name: &str) -> StemKey {
    StemKey::from(name)
}
