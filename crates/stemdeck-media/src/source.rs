//! Stem sources.
//!
//! A source hands out the raw, still-encoded bytes of each stem on demand.
//! The separation pipeline that produces them lives elsewhere; the deck only
//! needs to fetch what it already made.

use crate::error::{MediaError, MediaResult};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use stemdeck_core::{StemKey, StemKind};
use tracing::debug;

/// Supplies raw stem bytes per key.
pub trait StemSource: Send + Sync {
    /// Keys this source can provide, in channel-strip order.
    fn keys(&self) -> Vec<StemKey>;

    /// Extension of the files this source hands out.
    fn extension(&self) -> &str {
        "wav"
    }

    /// Where the stem can be fetched from, if the source has it.
    fn resource_uri(&self, key: &StemKey) -> Option<String>;

    /// Fetch the encoded bytes for a stem.
    ///
    /// `Ok(None)` means the source has no data for this key.
    fn fetch(&self, key: &StemKey) -> impl Future<Output = MediaResult<Option<Vec<u8>>>> + Send;
}

/// Order keys the way channel strips are shown: known sources first in
/// their canonical order, then anything else alphabetically.
fn strip_order(mut keys: Vec<StemKey>) -> Vec<StemKey> {
    keys.sort_by_key(|key| {
        let rank = key
            .kind()
            .and_then(|kind| StemKind::SOURCES.iter().position(|k| *k == kind))
            .unwrap_or(StemKind::SOURCES.len());
        (rank, key.as_str().to_string())
    });
    keys
}

/// Stems stored as `<key>.<ext>` files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStemSource {
    root: PathBuf,
    extension: String,
}

impl DirectoryStemSource {
    /// Source reading `<root>/<key>.wav`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extension(root, "wav")
    }

    pub fn with_extension(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a stem's file. Keys that would leave `root` are refused.
    fn path_for(&self, key: &StemKey) -> MediaResult<PathBuf> {
        if !key.is_file_safe() {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key.file_name(&self.extension)))
    }
}

impl StemSource for DirectoryStemSource {
    fn keys(&self) -> Vec<StemKey> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let keys = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
            })
            .filter_map(|path| {
                path.file_stem()
                    .map(|stem| StemKey::new(stem.to_string_lossy()))
            })
            .filter(|key| key.is_file_safe() && !key.is_merged())
            .collect();
        strip_order(keys)
    }

    fn extension(&self) -> &str {
        &self.extension
    }

    fn resource_uri(&self, key: &StemKey) -> Option<String> {
        let path = self.path_for(key).ok()?;
        path.exists().then(|| format!("file://{}", path.display()))
    }

    async fn fetch(&self, key: &StemKey) -> MediaResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!(key = %key, path = %path.display(), bytes = bytes.len(), "Fetched stem");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Stems held in memory, e.g. straight out of a separation run.
#[derive(Debug, Clone, Default)]
pub struct MemoryStemSource {
    stems: HashMap<StemKey, Vec<u8>>,
}

impl MemoryStemSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a stem's bytes.
    pub fn insert(&mut self, key: impl Into<StemKey>, bytes: Vec<u8>) {
        self.stems.insert(key.into(), bytes);
    }

    pub fn remove(&mut self, key: &StemKey) -> Option<Vec<u8>> {
        self.stems.remove(key)
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }
}

impl StemSource for MemoryStemSource {
    fn keys(&self) -> Vec<StemKey> {
        strip_order(self.stems.keys().cloned().collect())
    }

    fn resource_uri(&self, key: &StemKey) -> Option<String> {
        self.stems
            .contains_key(key)
            .then(|| format!("memory://{key}"))
    }

    async fn fetch(&self, key: &StemKey) -> MediaResult<Option<Vec<u8>>> {
        Ok(self.stems.get(key).cloned())
    }
}
