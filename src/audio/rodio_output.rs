//! Speaker output through `rodio`.
//!
//! `rodio::OutputStream` is not `Send`, so each loaded clip gets its own
//! audio thread that owns the stream and sink. The handle talks to it over a
//! channel.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};
use tokio::sync::oneshot;
use tracing::debug;

use super::playback::{AudioHandle, AudioOutput, PlaybackCompletion, PlaybackOutcome};
use super::types::AudioClip;
use crate::error::AniError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Plays clips on the default output device.
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioOutput;

enum Command {
    Play(oneshot::Sender<PlaybackOutcome>),
    Stop,
    Release,
}

struct RodioHandle {
    commands: mpsc::Sender<Command>,
}

impl AudioHandle for RodioHandle {
    fn play(&mut self) -> Result<PlaybackCompletion, AniError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Play(tx))
            .map_err(|_| AniError::Playback("audio thread exited".into()))?;
        Ok(rx)
    }

    fn stop(&mut self) {
        let _ = self.commands.send(Command::Stop);
    }

    fn release(self: Box<Self>) {
        let _ = self.commands.send(Command::Release);
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn AudioHandle>, AniError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (commands, command_rx) = mpsc::channel();
        let path = clip.path().to_path_buf();

        std::thread::Builder::new()
            .name("ani-audio".into())
            .spawn(move || audio_thread(path, ready_tx, command_rx))?;

        ready_rx
            .await
            .map_err(|_| AniError::Playback("audio thread exited during load".into()))?
            .map_err(AniError::Playback)?;

        Ok(Box::new(RodioHandle { commands }))
    }
}

fn open_sink(path: &Path) -> Result<(OutputStream, Sink), String> {
    let (stream, stream_handle) =
        OutputStream::try_default().map_err(|e| format!("no output device: {e}"))?;
    let sink = Sink::try_new(&stream_handle).map_err(|e| format!("cannot open sink: {e}"))?;
    let file = File::open(path).map_err(|e| format!("cannot open {}: {e}", path.display()))?;
    let source = Decoder::new(BufReader::new(file)).map_err(|e| format!("cannot decode: {e}"))?;
    sink.pause();
    sink.append(source);
    Ok((stream, sink))
}

fn audio_thread(
    path: PathBuf,
    ready: oneshot::Sender<Result<(), String>>,
    commands: mpsc::Receiver<Command>,
) {
    let (_stream, sink) = match open_sink(&path) {
        Ok(opened) => {
            let _ = ready.send(Ok(()));
            opened
        }
        Err(reason) => {
            let _ = ready.send(Err(reason));
            return;
        }
    };

    let mut pending: Option<oneshot::Sender<PlaybackOutcome>> = None;
    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(Command::Play(done)) => {
                sink.play();
                pending = Some(done);
            }
            Ok(Command::Stop) => {
                sink.stop();
                pending = None;
            }
            Ok(Command::Release) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if sink.empty() {
            if let Some(done) = pending.take() {
                let _ = done.send(PlaybackOutcome::Finished);
            }
        }
    }

    debug!(path = %path.display(), "Audio thread released");
}
