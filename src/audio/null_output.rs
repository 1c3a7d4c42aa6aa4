//! Headless output: accepts a clip and reports it finished immediately.

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::playback::{AudioHandle, AudioOutput, PlaybackCompletion, PlaybackOutcome};
use super::types::AudioClip;
use crate::error::AniError;

/// Audio output for environments without a sound device.
///
/// Loading still checks that the clip exists, so a broken synthesis result
/// surfaces as a playback failure just as it would on a real device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOutput;

struct NullHandle;

impl AudioHandle for NullHandle {
    fn play(&mut self) -> Result<PlaybackCompletion, AniError> {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(PlaybackOutcome::Finished);
        Ok(rx)
    }

    fn stop(&mut self) {}

    fn release(self: Box<Self>) {}
}

#[async_trait]
impl AudioOutput for NullOutput {
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn AudioHandle>, AniError> {
        let metadata = tokio::fs::metadata(clip.path()).await.map_err(|e| {
            AniError::Playback(format!("cannot open {}: {e}", clip.path().display()))
        })?;
        if metadata.len() == 0 {
            return Err(AniError::Playback("clip is empty".into()));
        }
        Ok(Box::new(NullHandle))
    }
}
