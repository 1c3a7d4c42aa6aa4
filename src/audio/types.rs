//! Audio value types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Voice-quality settings sent with every synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
            style: 0.1,
            use_speaker_boost: true,
        }
    }
}

/// Locator for one persisted, synthesized utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    path: PathBuf,
    mime_type: String,
    len: usize,
}

impl AudioClip {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>, len: usize) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
            len,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Size of the encoded audio in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
