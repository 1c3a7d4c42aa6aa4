//! Text-to-speech trait.

use async_trait::async_trait;

use super::types::AudioClip;
use crate::error::AniError;

/// Trait for text-to-speech backends.
///
/// A successful call leaves exactly one new audio file behind; the caller
/// (normally the [`PlaybackController`](super::PlaybackController)) owns its
/// cleanup. Failures are reported as [`AniError::Synthesis`] and write nothing.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        api_key: &str,
        voice_id: &str,
    ) -> Result<AudioClip, AniError>;
}
