//! Conversation orchestration.

pub mod orchestrator;

pub use orchestrator::{ChatPhase, ChatSnapshot, DropReason, Orchestrator, SubmitOutcome};
