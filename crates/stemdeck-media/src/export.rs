//! Exporting stems to disk.
//!
//! "Export all" is an ordered batch: each stem is fetched and written in
//! turn, and one failing stem does not stop the ones after it.

use crate::error::{MediaError, MediaResult};
use crate::source::StemSource;
use std::path::{Path, PathBuf};
use stemdeck_core::StemKey;
use tracing::{info, warn};

/// Outcome of an export batch, in the order the stems were processed.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Files written.
    pub written: Vec<PathBuf>,
    /// Stems the source had no data for.
    pub skipped: Vec<StemKey>,
    /// Stems that failed, with the reason.
    pub failed: Vec<(StemKey, String)>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Write one stem's bytes to `<dir>/<key>.<extension>`.
pub async fn write_stem(dir: &Path, key: &StemKey, extension: &str, bytes: &[u8]) -> MediaResult<PathBuf> {
    if !key.is_file_safe() {
        return Err(MediaError::InvalidKey(key.to_string()));
    }
    if bytes.is_empty() {
        return Err(MediaError::MissingStem(key.to_string()));
    }
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(key.file_name(extension));
    tokio::fs::write(&path, bytes).await?;
    info!(key = %key, path = %path.display(), "Exported stem");
    Ok(path)
}

/// Export `keys` from `source` into `dir`, one after another.
pub async fn export_all<S: StemSource>(
    source: &S,
    keys: &[StemKey],
    dir: &Path,
) -> MediaResult<ExportReport> {
    tokio::fs::create_dir_all(dir).await?;
    let mut report = ExportReport::default();

    for key in keys {
        let bytes = match source.fetch(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                warn!(key = %key, "No data for stem, skipping export");
                report.skipped.push(key.clone());
                continue;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to fetch stem for export");
                report.failed.push((key.clone(), e.to_string()));
                continue;
            }
        };

        match write_stem(dir, key, source.extension(), &bytes).await {
            Ok(path) => report.written.push(path),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to write stem");
                report.failed.push((key.clone(), e.to_string()));
            }
        }
    }

    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "Export batch finished"
    );
    Ok(report)
}
