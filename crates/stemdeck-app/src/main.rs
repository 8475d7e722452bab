//! StemDeck - Multi-stem player
//!
//! Entry point: plays, merges and exports the stems in a directory.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use stemdeck_audio::StemDeck;
use stemdeck_core::{format_time, DeckConfig, StemKey};
use stemdeck_media::{export_all, DirectoryStemSource, StemSource};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command-line arguments for stemdeck
#[derive(Parser, Debug)]
#[command(name = "stemdeck")]
#[command(about = "Play, merge and export separated stems")]
#[command(version)]
struct Args {
    /// Deck configuration file (JSON)
    #[arg(short, long, global = true, env = "STEMDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play every stem in a directory under one transport
    Play {
        /// Directory holding <key>.wav stems
        #[arg(short, long)]
        dir: PathBuf,

        /// Stop after this many seconds
        #[arg(short, long)]
        seconds: Option<f64>,

        /// Per-stem gain, e.g. --gain vocals=40
        #[arg(short, long, value_parser = parse_gain)]
        gain: Vec<(StemKey, f32)>,
    },
    /// Merge selected stems into one WAV file
    Merge {
        /// Directory holding <key>.wav stems
        #[arg(short, long)]
        dir: PathBuf,

        /// Stems to merge, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        keys: Vec<String>,

        /// Output file
        #[arg(short, long, default_value = "merged.wav")]
        out: PathBuf,
    },
    /// Copy every stem in a directory to another directory, in strip order
    Export {
        /// Directory holding <key>.wav stems
        #[arg(short, long)]
        dir: PathBuf,

        /// Target directory
        #[arg(short, long)]
        out_dir: PathBuf,
    },
}

fn parse_gain(arg: &str) -> std::result::Result<(StemKey, f32), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=GAIN, got '{arg}'"))?;
    let gain = value
        .parse::<f32>()
        .map_err(|e| format!("invalid gain '{value}': {e}"))?;
    Ok((StemKey::new(key.trim()), gain))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Play { dir, seconds, gain } => play(dir, seconds, &gain, config).await,
        Command::Merge { dir, keys, out } => merge(dir, &keys, &out, config).await,
        Command::Export { dir, out_dir } => export(dir, &out_dir).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<DeckConfig> {
    let config = match path {
        Some(path) => DeckConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match DeckConfig::default_path() {
            Some(path) => DeckConfig::load_or_default(&path)?,
            None => DeckConfig::default(),
        },
    };
    config.validate()?;
    Ok(config)
}

async fn open_deck(dir: PathBuf, config: DeckConfig) -> Result<StemDeck> {
    if !dir.is_dir() {
        bail!("Stem directory not found: {}", dir.display());
    }
    let mut deck = StemDeck::open_dir(dir, config);
    let loaded = deck.load_all().await;
    if loaded.is_empty() {
        bail!("No playable stems found");
    }
    info!(stems = ?loaded, "Deck ready");
    Ok(deck)
}

async fn play(dir: PathBuf, seconds: Option<f64>, gains: &[(StemKey, f32)], config: DeckConfig) -> Result<()> {
    let poll = config.poll_interval();
    let mut deck = open_deck(dir, config).await?;

    for (key, value) in gains {
        match deck.set_gain(key, *value) {
            Ok(gain) => info!(key = %key, gain, "Gain set"),
            Err(e) => warn!(key = %key, error = %e, "Cannot set gain"),
        }
    }

    #[cfg(feature = "device-output")]
    let _output = {
        let ring = deck.attach_output();
        stemdeck_audio::DeviceOutput::open(ring, deck.config().target_sample_rate)
            .context("Failed to open audio output")?
    };

    let started = deck.play_all();
    info!(started, "Playback started");

    let limit = seconds.map(Duration::from_secs_f64);
    let begin = Instant::now();
    let mut last = begin;
    let mut interval = tokio::time::interval(poll);
    loop {
        interval.tick().await;
        let now = Instant::now();
        let playhead = deck.tick(now - last);
        last = now;
        info!(playhead = %format_time(playhead), "Tick");

        if !deck.is_any_playing() {
            info!("All stems finished");
            break;
        }
        if limit.is_some_and(|limit| now - begin >= limit) {
            break;
        }
    }

    deck.stop_all();
    info!("Playback stopped");
    Ok(())
}

async fn merge(dir: PathBuf, keys: &[String], out: &Path, config: DeckConfig) -> Result<()> {
    let mut deck = open_deck(dir, config).await?;
    deck.enter_merge_mode();
    for key in keys {
        let key = StemKey::new(key.trim());
        if let Err(e) = deck.toggle_selection(&key) {
            warn!(key = %key, error = %e, "Skipping stem");
        }
    }

    let sources = deck.selected_keys();
    let merged = deck.merge().await.context("Merge failed")?.key().clone();

    let bytes = deck
        .artifact_bytes(&merged)
        .await?
        .context("Merge produced no artifact")?;
    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!(stems = ?sources, path = %out.display(), bytes = bytes.len(), "Merge written");
    Ok(())
}

async fn export(dir: PathBuf, out_dir: &Path) -> Result<()> {
    let source = DirectoryStemSource::new(dir);
    let keys = source.keys();
    if keys.is_empty() {
        bail!("No stems found in {}", source.root().display());
    }
    let report = export_all(&source, &keys, out_dir).await?;
    for path in &report.written {
        info!(path = %path.display(), "Written");
    }
    if !report.is_complete() {
        bail!(
            "{} stem(s) skipped, {} failed",
            report.skipped.len(),
            report.failed.len()
        );
    }
    Ok(())
}
