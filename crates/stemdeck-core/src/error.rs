//! Error types for StemDeck.

use thiserror::Error;

/// Store- and transport-level errors.
///
/// These are local and non-fatal: callers decide whether to surface them.
#[derive(Error, Debug)]
pub enum StemDeckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stem already exists: {0}")]
    DuplicateKey(String),

    #[error("Stem not found: {0}")]
    NotFound(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for StemDeck operations.
pub type Result<T> = std::result::Result<T, StemDeckError>;
