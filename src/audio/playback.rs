//! Single-slot playback controller.
//!
//! The controller owns the only live [`AudioHandle`]. Every way a handle can
//! leave the slot (explicit stop, supersession by a newer clip, natural
//! completion, controller drop) goes through one code path that stops it if
//! needed, releases it, and deletes the clip file. Whoever takes the handle
//! out of the slot is the one that releases it, so release happens once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use super::store::AudioStore;
use super::types::AudioClip;
use crate::error::AniError;

/// How a playback ended on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Failed(String),
}

/// Resolves when playback ends without being stopped. A dropped sender means
/// the handle was stopped or torn down.
pub type PlaybackCompletion = oneshot::Receiver<PlaybackOutcome>;

/// One loaded utterance on an audio device.
pub trait AudioHandle: Send {
    /// Start playing.
    fn play(&mut self) -> Result<PlaybackCompletion, AniError>;

    /// Halt output. Must be safe to call on a finished handle.
    fn stop(&mut self);

    /// Free the underlying resource. Consumes the handle.
    fn release(self: Box<Self>);
}

/// Loads clips into playable handles.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn AudioHandle>, AniError>;
}

/// Observable playback state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing { id: u64 },
    Finished { id: u64 },
    Failed { id: u64, reason: String },
    Stopped { id: u64 },
}

impl PlaybackStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Idle | Self::Playing { .. })
    }
}

struct ActivePlayback {
    id: u64,
    handle: Box<dyn AudioHandle>,
    clip: AudioClip,
}

struct Shared {
    slot: Mutex<Option<ActivePlayback>>,
    status_tx: watch::Sender<PlaybackStatus>,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Option<ActivePlayback>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Status changes are published while the slot lock is held, so the
    /// published status always describes the slot's current occupant.
    fn publish(&self, status: PlaybackStatus) {
        self.status_tx.send_replace(status);
    }

    /// Put `active` in the slot and return whatever it displaced.
    fn install(&self, active: ActivePlayback) -> Option<ActivePlayback> {
        let id = active.id;
        let mut slot = self.lock_slot();
        let displaced = slot.replace(active);
        self.publish(PlaybackStatus::Playing { id });
        displaced
    }

    /// Empty the slot, publishing `Stopped` for its occupant.
    fn take_stopped(&self) -> Option<ActivePlayback> {
        let mut slot = self.lock_slot();
        let active = slot.take()?;
        self.publish(PlaybackStatus::Stopped { id: active.id });
        Some(active)
    }

    /// Empty the slot only if it still holds `id`, publishing `status`.
    fn take_if_current(&self, id: u64, status: PlaybackStatus) -> Option<ActivePlayback> {
        let mut slot = self.lock_slot();
        match slot.as_ref() {
            Some(active) if active.id == id => {
                self.publish(status);
                slot.take()
            }
            _ => None,
        }
    }

    /// Publish `status` unless a newer clip already owns the slot.
    fn publish_if_idle(&self, status: PlaybackStatus) {
        let slot = self.lock_slot();
        if slot.is_none() {
            self.publish(status);
        }
    }

    /// Stop, release and discard a handle that was taken out of the slot.
    fn retire(mut active: ActivePlayback) {
        active.handle.stop();
        active.handle.release();
        AudioStore::discard(&active.clip);
        debug!(id = active.id, "Playback stopped and released");
    }

    /// Natural end of playback for `id`; no-op if it was already superseded.
    fn complete(&self, id: u64, outcome: PlaybackOutcome) {
        let status = match &outcome {
            PlaybackOutcome::Finished => PlaybackStatus::Finished { id },
            PlaybackOutcome::Failed(reason) => PlaybackStatus::Failed {
                id,
                reason: reason.clone(),
            },
        };
        let Some(active) = self.take_if_current(id, status) else {
            return;
        };
        active.handle.release();
        AudioStore::discard(&active.clip);

        match outcome {
            PlaybackOutcome::Finished => debug!(id, "Playback finished"),
            PlaybackOutcome::Failed(reason) => warn!(id, %reason, "Playback failed"),
        }
    }
}

/// Owns at most one active [`AudioHandle`].
pub struct PlaybackController {
    output: Arc<dyn AudioOutput>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
}

impl PlaybackController {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        let (status_tx, _) = watch::channel(PlaybackStatus::Idle);
        Self {
            output,
            shared: Arc::new(Shared {
                slot: Mutex::new(None),
                status_tx,
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Play `clip`, first stopping and releasing whatever is playing.
    ///
    /// Load or start failures are logged and published as
    /// [`PlaybackStatus::Failed`]; they are not returned. The clip file is
    /// deleted once playback is over, whichever way it ends.
    pub async fn play(&self, clip: AudioClip) {
        self.stop_and_release_current();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut handle = match self.output.load(&clip).await {
            Ok(handle) => handle,
            Err(err) => {
                self.fail_before_start(id, &clip, &err, "load");
                return;
            }
        };

        let completion = match handle.play() {
            Ok(completion) => completion,
            Err(err) => {
                handle.release();
                self.fail_before_start(id, &clip, &err, "start");
                return;
            }
        };

        // Another play may have registered while this one was loading.
        if let Some(previous) = self.shared.install(ActivePlayback { id, handle, clip }) {
            Shared::retire(previous);
        }
        info!(id, "Playback started");

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            match completion.await {
                Ok(outcome) => shared.complete(id, outcome),
                Err(_) => shared.complete(
                    id,
                    PlaybackOutcome::Failed("audio output ended without a result".into()),
                ),
            }
        });
    }

    /// Stop and release the active handle, if any. Safe to call when idle.
    pub fn stop_and_release_current(&self) {
        if let Some(active) = self.shared.take_stopped() {
            Shared::retire(active);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.shared.lock_slot().is_some()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.shared.status_tx.borrow().clone()
    }

    /// Subscribe to playback status changes.
    pub fn watch_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.shared.status_tx.subscribe()
    }

    fn fail_before_start(&self, id: u64, clip: &AudioClip, err: &AniError, stage: &str) {
        warn!(id, stage, error = %err, path = %clip.path().display(), "Playback could not start");
        AudioStore::discard(clip);
        self.shared.publish_if_idle(PlaybackStatus::Failed {
            id,
            reason: err.to_string(),
        });
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop_and_release_current();
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Inert;

    impl AudioHandle for Inert {
        fn play(&mut self) -> Result<PlaybackCompletion, AniError> {
            Err(AniError::Playback("inert".into()))
        }

        fn stop(&mut self) {}

        fn release(self: Box<Self>) {}
    }

    fn shared() -> Shared {
        Shared {
            slot: Mutex::new(None),
            status_tx: watch::channel(PlaybackStatus::Idle).0,
        }
    }

    fn entry(id: u64) -> ActivePlayback {
        ActivePlayback {
            id,
            handle: Box::new(Inert),
            clip: AudioClip::new(format!("/nonexistent/ani_{id}.mp3"), "audio/mpeg", 1),
        }
    }

    #[test]
    fn stale_completion_does_not_overwrite_newer_status() {
        let shared = shared();
        assert!(shared.install(entry(1)).is_none());
        let displaced = shared.install(entry(2)).map(|active| active.id);
        assert_eq!(displaced, Some(1));

        shared.complete(1, PlaybackOutcome::Finished);

        assert_eq!(*shared.status_tx.borrow(), PlaybackStatus::Playing { id: 2 });
        assert_eq!(shared.lock_slot().as_ref().map(|active| active.id), Some(2));
    }

    #[test]
    fn failure_of_an_older_start_is_hidden_while_a_newer_clip_plays() {
        let shared = shared();
        shared.install(entry(2));

        shared.publish_if_idle(PlaybackStatus::Failed {
            id: 1,
            reason: "load".into(),
        });

        assert_eq!(*shared.status_tx.borrow(), PlaybackStatus::Playing { id: 2 });
    }

    #[test]
    fn completion_of_the_occupant_publishes_and_empties_the_slot() {
        let shared = shared();
        shared.install(entry(7));

        shared.complete(7, PlaybackOutcome::Failed("unplugged".into()));

        assert!(shared.lock_slot().is_none());
        assert_eq!(
            *shared.status_tx.borrow(),
            PlaybackStatus::Failed {
                id: 7,
                reason: "unplugged".into()
            }
        );
    }
}
