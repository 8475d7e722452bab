//! Stem identity.
//!
//! A stem is addressed by a `StemKey`. Most keys name one of the sources a
//! separation model produces (`StemKind`), but any key is accepted so that
//! models with unusual source sets still load.

use crate::error::{Result, StemDeckError};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Stable identifier of a stem ("drums", "vocals", "merged", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StemKey(String);

impl StemKey {
    /// Key of the pseudo-stem produced by a mixdown.
    pub const MERGED: &'static str = "merged";

    /// Create a key from any string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key used for mixdown results.
    pub fn merged() -> Self {
        Self(Self::MERGED.to_string())
    }

    /// Whether this key names the mixdown result.
    pub fn is_merged(&self) -> bool {
        self.0 == Self::MERGED
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The known kind for this key, if any.
    pub fn kind(&self) -> Option<StemKind> {
        StemKind::from_key(&self.0)
    }

    /// Name shown on a channel strip. Unknown keys are shown verbatim.
    pub fn display_name(&self) -> String {
        match self.kind() {
            Some(kind) => kind.display_name().to_string(),
            None => self.0.clone(),
        }
    }

    /// Whether the key can name a file inside a stem directory: not empty,
    /// no path separators, no `..` and no NUL.
    pub fn is_file_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && !self.0.contains("..")
            && !self.0.contains(['/', '\\', '\0'])
    }

    /// `InvalidParameter` unless [`is_file_safe`](Self::is_file_safe).
    pub fn validate(&self) -> Result<()> {
        if self.is_file_safe() {
            Ok(())
        } else {
            Err(StemDeckError::InvalidParameter(format!(
                "stem key {:?} is not a plain file name",
                self.0
            )))
        }
    }

    /// File name for this stem with the given extension.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.0, extension)
    }
}

impl fmt::Display for StemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StemKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StemKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for StemKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Sources produced by the separation models, plus the mixdown result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemKind {
    Drums,
    Bass,
    Guitar,
    Piano,
    Other,
    Vocals,
    Merged,
}

impl StemKind {
    /// Separated sources in channel-strip order.
    pub const SOURCES: [StemKind; 6] = [
        StemKind::Drums,
        StemKind::Bass,
        StemKind::Guitar,
        StemKind::Piano,
        StemKind::Other,
        StemKind::Vocals,
    ];

    /// Look up a kind by its key.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "drums" => Some(Self::Drums),
            "bass" => Some(Self::Bass),
            "guitar" => Some(Self::Guitar),
            "piano" => Some(Self::Piano),
            "other" => Some(Self::Other),
            "vocals" => Some(Self::Vocals),
            StemKey::MERGED => Some(Self::Merged),
            _ => None,
        }
    }

    /// Key for this kind.
    pub fn key(&self) -> StemKey {
        StemKey::new(self.as_str())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drums => "drums",
            Self::Bass => "bass",
            Self::Guitar => "guitar",
            Self::Piano => "piano",
            Self::Other => "other",
            Self::Vocals => "vocals",
            Self::Merged => StemKey::MERGED,
        }
    }

    /// Display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Drums => "Drums",
            Self::Bass => "Bass",
            Self::Guitar => "Guitar",
            Self::Piano => "Piano",
            Self::Other => "Other",
            Self::Vocals => "Vocals",
            Self::Merged => "Merged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_resolve_to_kinds() {
        for kind in StemKind::SOURCES {
            assert_eq!(kind.key().kind(), Some(kind));
        }
        assert_eq!(StemKey::merged().kind(), Some(StemKind::Merged));
    }

    #[test]
    fn test_unknown_key_keeps_its_name() {
        let key = StemKey::new("synth_pad");
        assert_eq!(key.kind(), None);
        assert_eq!(key.display_name(), "synth_pad");
        assert_eq!(key.file_name("wav"), "synth_pad.wav");
    }

    #[test]
    fn test_path_like_keys_are_rejected() {
        for bad in ["", ".", "..", "../escape", "a/b", "a\\b", "up..", "nul\0"] {
            let key = StemKey::new(bad);
            assert!(!key.is_file_safe(), "{bad:?} accepted");
            assert!(matches!(key.validate(), Err(StemDeckError::InvalidParameter(_))));
        }
        for good in ["drums", "synth_pad", "lead.vox", "merged"] {
            assert!(StemKey::new(good).validate().is_ok(), "{good:?} rejected");
        }
    }

    #[test]
    fn test_merged_key() {
        assert!(StemKey::merged().is_merged());
        assert!(!StemKey::from("drums").is_merged());
        assert_eq!(StemKey::merged().display_name(), "Merged");
    }

    #[test]
    fn test_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&StemKey::from("vocals")).unwrap();
        assert_eq!(json, "\"vocals\"");
    }
}
