mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;

use ani::audio::{
    AudioClip, AudioHandle, AudioOutput, AudioStore, PlaybackController, PlaybackOutcome,
    PlaybackStatus,
};
use ani::error::AniError;
use common::{eventually, EventLog, MockOutput};
use pretty_assertions::assert_eq;

async fn clip_in(dir: &std::path::Path) -> AudioClip {
    AudioStore::new(dir)
        .save(b"ID3fake", "audio/mpeg")
        .await
        .unwrap()
}

fn controller() -> (PlaybackController, MockOutput) {
    let output = MockOutput::new(EventLog::default());
    (PlaybackController::new(Arc::new(output.clone())), output)
}

#[tokio::test]
async fn natural_completion_releases_once_and_deletes_file() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();
    let clip = clip_in(dir.path()).await;
    let path = clip.path().to_path_buf();

    playback.play(clip).await;
    assert!(playback.is_playing());
    assert_eq!(playback.status(), PlaybackStatus::Playing { id: 1 });

    let handle = output.handle(0);
    assert_eq!(handle.plays(), 1);
    assert!(handle.finish(PlaybackOutcome::Finished));

    eventually(|| !playback.is_playing()).await;
    assert_eq!(handle.releases(), 1);
    assert_eq!(handle.stops(), 0);
    assert_eq!(playback.status(), PlaybackStatus::Finished { id: 1 });
    assert!(!path.exists());
}

#[tokio::test]
async fn new_clip_preempts_the_current_one() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();
    let first = clip_in(dir.path()).await;
    let first_path = first.path().to_path_buf();

    playback.play(first).await;
    playback.play(clip_in(dir.path()).await).await;

    let old = output.handle(0);
    let new = output.handle(1);
    assert_eq!(old.stops(), 1);
    assert_eq!(old.releases(), 1);
    assert_eq!(new.plays(), 1);
    assert_eq!(new.releases(), 0);
    assert!(!first_path.exists());
    assert_eq!(playback.status(), PlaybackStatus::Playing { id: 2 });
}

#[tokio::test]
async fn late_completion_of_superseded_handle_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();

    playback.play(clip_in(dir.path()).await).await;
    let old = output.handle(0);
    playback.play(clip_in(dir.path()).await).await;

    old.finish(PlaybackOutcome::Finished);
    tokio::task::yield_now().await;

    let new = output.handle(1);
    assert_eq!(old.releases(), 1);
    assert_eq!(new.releases(), 0);
    assert_eq!(new.stops(), 0);
    assert!(playback.is_playing());
}

#[tokio::test]
async fn explicit_stop_releases_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();
    let clip = clip_in(dir.path()).await;
    let path = clip.path().to_path_buf();

    playback.play(clip).await;
    playback.stop_and_release_current();
    playback.stop_and_release_current();

    let handle = output.handle(0);
    assert_eq!(handle.stops(), 1);
    assert_eq!(handle.releases(), 1);
    assert_eq!(playback.status(), PlaybackStatus::Stopped { id: 1 });
    assert!(!path.exists());

    // Completion after stop is a no-op.
    handle.finish(PlaybackOutcome::Finished);
    tokio::task::yield_now().await;
    assert_eq!(handle.releases(), 1);
}

#[tokio::test]
async fn load_failure_leaves_controller_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();
    let clip = clip_in(dir.path()).await;
    let path = clip.path().to_path_buf();

    output.fail_next_load();
    playback.play(clip).await;

    assert!(!playback.is_playing());
    assert_eq!(output.handle_count(), 0);
    assert!(matches!(playback.status(), PlaybackStatus::Failed { id: 1, .. }));
    assert!(!path.exists());
}

#[tokio::test]
async fn start_failure_releases_the_handle() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();

    output.fail_next_play();
    playback.play(clip_in(dir.path()).await).await;

    let handle = output.handle(0);
    assert_eq!(handle.plays(), 0);
    assert_eq!(handle.releases(), 1);
    assert!(!playback.is_playing());
    assert!(playback.status().is_terminal());
}

#[tokio::test]
async fn failure_during_playback_is_published() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();
    let mut status = playback.watch_status();

    playback.play(clip_in(dir.path()).await).await;
    output
        .handle(0)
        .finish(PlaybackOutcome::Failed("device unplugged".into()));

    eventually(|| !playback.is_playing()).await;
    assert_eq!(
        *status.borrow_and_update(),
        PlaybackStatus::Failed {
            id: 1,
            reason: "device unplugged".into()
        }
    );
    assert_eq!(output.handle(0).releases(), 1);
}

#[tokio::test]
async fn dropping_the_controller_releases_the_active_handle() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();

    playback.play(clip_in(dir.path()).await).await;
    drop(playback);

    let handle = output.handle(0);
    assert_eq!(handle.stops(), 1);
    assert_eq!(handle.releases(), 1);
}

#[tokio::test]
async fn at_most_one_handle_is_live_across_many_plays() {
    let dir = tempfile::tempdir().unwrap();
    let (playback, output) = controller();

    for _ in 0..5 {
        playback.play(clip_in(dir.path()).await).await;
    }

    let live = (0..output.handle_count())
        .filter(|&i| output.handle(i).releases() == 0)
        .count();
    assert_eq!(live, 1);
    for i in 0..4 {
        assert_eq!(output.handle(i).releases(), 1);
    }
}

/// First load blocks until released and then fails; later loads succeed.
struct SlowFirstLoad {
    inner: MockOutput,
    first: AtomicBool,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl AudioOutput for SlowFirstLoad {
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn AudioHandle>, AniError> {
        if self.first.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
            return Err(AniError::Playback("decoder gave up".into()));
        }
        self.inner.load(clip).await
    }
}

#[tokio::test]
async fn late_failure_of_an_older_play_keeps_the_newer_status() {
    let dir = tempfile::tempdir().unwrap();
    let inner = MockOutput::new(EventLog::default());
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let playback = Arc::new(PlaybackController::new(Arc::new(SlowFirstLoad {
        inner: inner.clone(),
        first: AtomicBool::new(true),
        entered: Arc::clone(&entered),
        release: Arc::clone(&release),
    })));

    let older = {
        let playback = Arc::clone(&playback);
        let clip = clip_in(dir.path()).await;
        tokio::spawn(async move { playback.play(clip).await })
    };
    entered.notified().await;

    playback.play(clip_in(dir.path()).await).await;
    assert_eq!(playback.status(), PlaybackStatus::Playing { id: 2 });

    release.notify_one();
    older.await.unwrap();

    assert_eq!(playback.status(), PlaybackStatus::Playing { id: 2 });
    assert!(playback.is_playing());
    assert_eq!(inner.handle(0).releases(), 0);
}
