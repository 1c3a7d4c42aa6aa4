//! Convenience re-exports for common use.

pub use crate::audio::{AudioClip, AudioOutput, PlaybackController, PlaybackStatus, SpeechSynthesizer};
pub use crate::chat::{ChatPhase, ChatSnapshot, DropReason, Orchestrator, SubmitOutcome};
pub use crate::config::{AniConfig, Credentials};
pub use crate::error::{AniError, Result};
pub use crate::provider::TextGenerator;
pub use crate::types::{Conversation, Sender, Turn, TurnId};
