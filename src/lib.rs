//! Ani: conversation core for a voice companion.
//!
//! Takes user text, asks a text-generation backend (Gemini) for the next
//! assistant turn, optionally voices that turn through a speech backend
//! (ElevenLabs) and keeps at most one utterance playing at a time.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ani::prelude::*;
//! use ani::audio::NullOutput;
//!
//! # async fn example() -> ani::error::Result<()> {
//! let config = AniConfig::from_env();
//! let chat = Arc::new(Orchestrator::from_config(config, Arc::new(NullOutput)));
//!
//! chat.submit("hi").await?;
//! for turn in chat.turns() {
//!     println!("[{}] {}: {}", turn.display_time, turn.sender, turn.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod chat;
pub mod config;
pub mod error;
pub mod persona;
pub mod prelude;
pub mod provider;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
