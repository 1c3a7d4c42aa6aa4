//! On-disk storage for synthesized clips.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use super::types::AudioClip;
use crate::error::AniError;

const FILE_PREFIX: &str = "ani_voice";

/// Writes clips into one directory under collision-free names.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the system temp directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `bytes` as a new clip. Names combine the wall clock with a
    /// random token, so two calls never share a path.
    pub async fn save(&self, bytes: &[u8], mime_type: &str) -> Result<AudioClip, AniError> {
        if bytes.is_empty() {
            return Err(AniError::InvalidArgument("Refusing to store empty audio".into()));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!(
            "{FILE_PREFIX}_{}_{}.{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension_for_mime(mime_type)
        );
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "Audio saved");
        Ok(AudioClip::new(path, mime_type, bytes.len()))
    }

    /// Delete a clip's file. Already-missing files count as discarded.
    pub fn discard(clip: &AudioClip) -> bool {
        match std::fs::remove_file(clip.path()) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                warn!(path = %clip.path().display(), error = %e, "Failed to delete audio clip");
                false
            }
        }
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    let mime = mime_type.split(';').next().map(str::trim).unwrap_or_default();
    match mime {
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/ogg" | "audio/opus" => "ogg",
        "audio/pcm" => "pcm",
        _ => "mp3",
    }
}
