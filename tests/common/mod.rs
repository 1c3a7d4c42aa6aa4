//! Shared fakes for orchestrator and playback tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use ani::audio::{
    AudioClip, AudioHandle, AudioOutput, AudioStore, PlaybackCompletion, PlaybackOutcome,
    SpeechSynthesizer,
};
use ani::config::AniConfig;
use ani::error::AniError;
use ani::provider::TextGenerator;
use ani::types::Conversation;

/// Config with all three credentials present.
pub fn configured() -> AniConfig {
    let mut config = AniConfig::default();
    config.generation.api_key = Some("gemini-key".into());
    config.synthesis.api_key = Some("eleven-key".into());
    config.synthesis.voice_id = Some("voice-1".into());
    config
}

/// Ordered log of side effects across fakes.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// Text generator with queued replies. `Err` entries fail the call.
pub struct FakeGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
    pub histories: Mutex<Vec<Conversation>>,
    pub keys: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
    log: EventLog,
}

impl FakeGenerator {
    pub fn new(log: EventLog) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
            gate: None,
            entered: Arc::new(Notify::new()),
            log,
        }
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    /// Block every call until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Notified once a call has started.
    pub fn entered(&self) -> Arc<Notify> {
        Arc::clone(&self.entered)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate_reply(
        &self,
        history: &Conversation,
        api_key: &str,
    ) -> Result<String, AniError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories.lock().unwrap().push(history.clone());
        self.keys.lock().unwrap().push(api_key.to_string());
        self.log.push("generate");
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AniError::Generation(message)),
            None => Ok("ok".to_string()),
        }
    }
}

/// Speech synthesizer that writes real files into a directory.
pub struct FakeSynthesizer {
    store: AudioStore,
    fail: bool,
    pub calls: Mutex<Vec<(String, String, String)>>,
    pub clips: Mutex<Vec<PathBuf>>,
    log: EventLog,
}

impl FakeSynthesizer {
    pub fn new(dir: &Path, log: EventLog) -> Self {
        Self {
            store: AudioStore::new(dir),
            fail: false,
            calls: Mutex::new(Vec::new()),
            clips: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        api_key: &str,
        voice_id: &str,
    ) -> Result<AudioClip, AniError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), api_key.to_string(), voice_id.to_string()));
        self.log.push("synthesize");
        if self.fail {
            return Err(AniError::Synthesis("HTTP 500".into()));
        }
        let clip = self.store.save(b"ID3fake-mp3", "audio/mpeg").await?;
        self.clips.lock().unwrap().push(clip.path().to_path_buf());
        Ok(clip)
    }
}

/// Per-handle counters.
#[derive(Default)]
pub struct HandleRecord {
    plays: AtomicUsize,
    stops: AtomicUsize,
    releases: AtomicUsize,
    completion: Mutex<Option<oneshot::Sender<PlaybackOutcome>>>,
}

impl HandleRecord {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Signal the end of playback. Returns false if nobody listens anymore.
    pub fn finish(&self, outcome: PlaybackOutcome) -> bool {
        match self.completion.lock().unwrap().take() {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }
}

/// Audio output whose handles record every call and complete on demand.
#[derive(Clone, Default)]
pub struct MockOutput {
    handles: Arc<Mutex<Vec<Arc<HandleRecord>>>>,
    loaded: Arc<Mutex<Vec<PathBuf>>>,
    fail_load: Arc<Mutex<bool>>,
    fail_play: Arc<Mutex<bool>>,
    log: EventLog,
}

impl MockOutput {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn fail_next_load(&self) {
        *self.fail_load.lock().unwrap() = true;
    }

    pub fn fail_next_play(&self) {
        *self.fail_play.lock().unwrap() = true;
    }

    pub fn handle(&self, index: usize) -> Arc<HandleRecord> {
        Arc::clone(&self.handles.lock().unwrap()[index])
    }

    pub fn handle_count(&self) -> usize {
        self.handles.lock().unwrap().len()
    }

    /// Paths of every clip handed to `load`, failed loads included.
    pub fn loaded_paths(&self) -> Vec<PathBuf> {
        self.loaded.lock().unwrap().clone()
    }
}

struct MockHandle {
    record: Arc<HandleRecord>,
    fail_play: bool,
    log: EventLog,
}

impl AudioHandle for MockHandle {
    fn play(&mut self) -> Result<PlaybackCompletion, AniError> {
        if self.fail_play {
            return Err(AniError::Playback("device busy".into()));
        }
        self.record.plays.fetch_add(1, Ordering::SeqCst);
        self.log.push("play");
        let (tx, rx) = oneshot::channel();
        *self.record.completion.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    fn stop(&mut self) {
        self.record.stops.fetch_add(1, Ordering::SeqCst);
        self.log.push("stop");
    }

    fn release(self: Box<Self>) {
        self.record.releases.fetch_add(1, Ordering::SeqCst);
        self.log.push("release");
    }
}

#[async_trait]
impl AudioOutput for MockOutput {
    async fn load(&self, clip: &AudioClip) -> Result<Box<dyn AudioHandle>, AniError> {
        self.loaded.lock().unwrap().push(clip.path().to_path_buf());
        if std::mem::take(&mut *self.fail_load.lock().unwrap()) {
            return Err(AniError::Playback(format!(
                "unsupported file {}",
                clip.path().display()
            )));
        }
        let record = Arc::new(HandleRecord::default());
        self.handles.lock().unwrap().push(Arc::clone(&record));
        self.log.push("load");
        Ok(Box::new(MockHandle {
            record,
            fail_play: std::mem::take(&mut *self.fail_play.lock().unwrap()),
            log: self.log.clone(),
        }))
    }
}

/// Wait until `condition` holds, yielding to spawned tasks in between.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
