//! The conversation state machine.
//!
//! ```text
//! Idle ─▶ Submitting ─▶ Generating ─┬─▶ Synthesizing ─▶ Playing ─▶ Idle
//!                                   ├─▶ Idle            (voice off / synthesis failed)
//!                                   └─▶ Idle            (generation failed: fallback turn)
//! ```
//!
//! [`Orchestrator::submit`] is single-flight: while one submission is being
//! processed every other call is dropped. The latch is released as soon as
//! playback has been dispatched; it does not wait for audio to finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::audio::{AudioOutput, ElevenLabsClient, PlaybackController, SpeechSynthesizer};
use crate::config::AniConfig;
use crate::error::Result;
use crate::provider::{GeminiClient, TextGenerator};
use crate::types::{Conversation, Turn};

/// Where the orchestrator is in processing a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ChatPhase {
    Idle,
    Submitting,
    Generating,
    Synthesizing,
    /// Playback is being dispatched. The phase returns to `Idle` once the
    /// clip is handed over, not when audio ends.
    Playing,
}

/// Point-in-time view of everything a front-end renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSnapshot {
    /// Chronological history.
    pub conversation: Conversation,
    pub phase: ChatPhase,
    pub in_flight: bool,
    pub voice_enabled: bool,
    /// Most recent recovered failure of the current or last submission.
    pub last_error: Option<String>,
}

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Another submission is still being processed.
    Busy,
    /// The text was empty after trimming.
    EmptyInput,
}

/// Result of [`Orchestrator::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The generated reply was appended. `voiced` is true when synthesis
    /// succeeded and the clip was handed to the playback controller.
    Replied { voiced: bool },
    /// Generation failed and the fallback turn was appended.
    FellBack,
    /// Nothing happened.
    Dropped(DropReason),
}

struct ChatState {
    conversation: Conversation,
    phase: ChatPhase,
    last_error: Option<String>,
}

/// Owns the conversation and sequences generation, synthesis and playback.
///
/// All methods take `&self`; wrap in an `Arc` to share with UI tasks.
pub struct Orchestrator {
    config: AniConfig,
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    playback: PlaybackController,
    state: Mutex<ChatState>,
    in_flight: AtomicBool,
    voice_enabled: AtomicBool,
    snapshot_tx: watch::Sender<ChatSnapshot>,
}

/// Holds the in-flight latch for one submission.
///
/// Dropping the guard returns to `Idle` and clears the latch on every exit
/// path, including cancellation of the `submit` future. A submission dropped
/// after its user turn but before any reply still gets the fallback turn, so
/// user and agent turns keep alternating.
struct InFlightGuard<'a> {
    orchestrator: &'a Orchestrator,
    awaiting_reply: bool,
}

impl<'a> InFlightGuard<'a> {
    /// Set the latch and enter `Submitting` under the state lock.
    fn acquire(orchestrator: &'a Orchestrator) -> Option<Self> {
        let mut state = orchestrator.lock_state();
        orchestrator
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        state.phase = ChatPhase::Submitting;
        state.last_error = None;
        orchestrator.publish(&state);

        Some(Self {
            orchestrator,
            awaiting_reply: false,
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let orchestrator = self.orchestrator;
        let mut state = orchestrator.lock_state();
        if self.awaiting_reply {
            warn!("Submission cancelled before a reply; appending fallback turn");
            state
                .conversation
                .push(Turn::agent(orchestrator.config.chat.fallback_message.clone()));
            state.last_error = Some("Submission cancelled before a reply arrived".into());
        }
        state.phase = ChatPhase::Idle;
        orchestrator.in_flight.store(false, Ordering::Release);
        orchestrator.publish(&state);
    }
}

impl Orchestrator {
    pub fn new(
        config: AniConfig,
        generator: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        playback: PlaybackController,
    ) -> Self {
        let conversation = Conversation::seeded(config.greeting());
        let voice_enabled = config.chat.voice_enabled;
        let (snapshot_tx, _) = watch::channel(ChatSnapshot {
            conversation: conversation.clone(),
            phase: ChatPhase::Idle,
            in_flight: false,
            voice_enabled,
            last_error: None,
        });

        Self {
            config,
            generator,
            synthesizer,
            playback,
            state: Mutex::new(ChatState {
                conversation,
                phase: ChatPhase::Idle,
                last_error: None,
            }),
            in_flight: AtomicBool::new(false),
            voice_enabled: AtomicBool::new(voice_enabled),
            snapshot_tx,
        }
    }

    /// Wire the Gemini and ElevenLabs clients described by `config`.
    pub fn from_config(config: AniConfig, output: Arc<dyn AudioOutput>) -> Self {
        let generator = Arc::new(GeminiClient::from_config(&config.generation));
        let synthesizer = Arc::new(ElevenLabsClient::from_config(&config));
        Self::new(config, generator, synthesizer, PlaybackController::new(output))
    }

    /// Process one user message.
    ///
    /// Returns `Ok(Dropped(..))` without side effects when busy or when the
    /// text is blank, and `Err(AniError::Configuration)` without side effects
    /// when credentials are missing. Backend failures never surface here:
    /// a generation failure appends the fallback turn, a synthesis failure
    /// only skips playback.
    pub async fn submit(&self, raw_text: &str) -> Result<SubmitOutcome> {
        if self.in_flight.load(Ordering::Acquire) {
            debug!("Submission dropped: request in flight");
            return Ok(SubmitOutcome::Dropped(DropReason::Busy));
        }
        if raw_text.trim().is_empty() {
            return Ok(SubmitOutcome::Dropped(DropReason::EmptyInput));
        }
        let credentials = self.config.credentials()?;

        let Some(mut guard) = InFlightGuard::acquire(self) else {
            debug!("Submission dropped: lost admission race");
            return Ok(SubmitOutcome::Dropped(DropReason::Busy));
        };

        // Everything up to the first await runs before any network activity.
        self.playback.stop_and_release_current();
        let history = self.update(|state| {
            state.conversation.push(Turn::user(raw_text));
            state.phase = ChatPhase::Generating;
            state.conversation.clone()
        });
        guard.awaiting_reply = true;

        info!(turns = history.len(), "Requesting agent reply");
        let reply = match self
            .generator
            .generate_reply(&history, &credentials.generation_api_key)
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "Generation failed; appending fallback turn");
                let fallback = self.config.chat.fallback_message.clone();
                self.update(|state| {
                    state.conversation.push(Turn::agent(fallback));
                    state.last_error = Some(err.to_string());
                });
                guard.awaiting_reply = false;
                return Ok(SubmitOutcome::FellBack);
            }
        };

        let voice_enabled = self.update(|state| {
            state.conversation.push(Turn::agent(reply.clone()));
            let voice_enabled = self.voice_enabled();
            if voice_enabled {
                state.phase = ChatPhase::Synthesizing;
            }
            voice_enabled
        });
        guard.awaiting_reply = false;
        if !voice_enabled {
            return Ok(SubmitOutcome::Replied { voiced: false });
        }

        let clip = match self
            .synthesizer
            .synthesize(&reply, &credentials.synthesis_api_key, &credentials.voice_id)
            .await
        {
            Ok(clip) => clip,
            Err(err) => {
                warn!(error = %err, "Synthesis failed; reply stays text-only");
                self.update(|state| state.last_error = Some(err.to_string()));
                return Ok(SubmitOutcome::Replied { voiced: false });
            }
        };

        self.update(|state| state.phase = ChatPhase::Playing);
        self.playback.play(clip).await;
        Ok(SubmitOutcome::Replied { voiced: true })
    }

    /// Current observable state.
    pub fn snapshot(&self) -> ChatSnapshot {
        let state = self.lock_state();
        self.snapshot_of(&state)
    }

    /// Subscribe to state changes.
    pub fn watch(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Chronological copy of the conversation.
    pub fn conversation(&self) -> Conversation {
        self.lock_state().conversation.clone()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.lock_state().conversation.turns().to_vec()
    }

    pub fn phase(&self) -> ChatPhase {
        self.lock_state().phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled.load(Ordering::Acquire)
    }

    /// Decides whether later replies are voiced. Already-appended turns are
    /// unaffected.
    pub fn set_voice_enabled(&self, enabled: bool) {
        self.voice_enabled.store(enabled, Ordering::Release);
        self.update(|_| ());
    }

    /// Flip the voice toggle and return the new value.
    pub fn toggle_voice(&self) -> bool {
        let enabled = !self.voice_enabled.fetch_xor(true, Ordering::AcqRel);
        self.update(|_| ());
        enabled
    }

    /// Silence the current utterance, if any.
    pub fn stop_playback(&self) {
        self.playback.stop_and_release_current();
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    fn lock_state(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot_of(&self, state: &ChatState) -> ChatSnapshot {
        ChatSnapshot {
            conversation: state.conversation.clone(),
            phase: state.phase,
            in_flight: self.is_in_flight(),
            voice_enabled: self.voice_enabled(),
            last_error: state.last_error.clone(),
        }
    }

    /// Mutate state and publish the resulting snapshot. The lock is never
    /// held across an await.
    fn update<T>(&self, mutate: impl FnOnce(&mut ChatState) -> T) -> T {
        let mut state = self.lock_state();
        let result = mutate(&mut state);
        self.publish(&state);
        result
    }

    /// Callers hold the state lock, so snapshots are published in the order
    /// the state changed.
    fn publish(&self, state: &ChatState) {
        self.snapshot_tx.send_replace(self.snapshot_of(state));
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("phase", &self.phase())
            .field("in_flight", &self.is_in_flight())
            .field("voice_enabled", &self.voice_enabled())
            .field("playback", &self.playback)
            .finish_non_exhaustive()
    }
}
