//! Error types for stem I/O.

use thiserror::Error;

/// Errors raised by sources, the decoder and the encoder.
#[derive(Debug, Error)]
pub enum MediaError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes could not be decoded into PCM.
    #[error("Decode error: {0}")]
    Decode(String),

    /// PCM could not be written to the container.
    #[error("Encode error: {0}")]
    Encode(String),

    /// Container or codec not handled by the decoder.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The key cannot be used as a file name.
    #[error("Invalid stem key: {0:?}")]
    InvalidKey(String),

    /// The source has no data for this stem.
    #[error("Stem not available: {0}")]
    MissingStem(String),
}

/// Result type alias for media operations.
pub type MediaResult<T> = std::result::Result<T, MediaError>;
