//! Audio: speech synthesis, on-disk clip storage, and single-slot playback.

pub mod elevenlabs;
pub mod null_output;
pub mod playback;
#[cfg(feature = "playback")]
pub mod rodio_output;
pub mod store;
pub mod tts;
pub mod types;

pub use elevenlabs::ElevenLabsClient;
pub use null_output::NullOutput;
pub use playback::{
    AudioHandle, AudioOutput, PlaybackCompletion, PlaybackController, PlaybackOutcome,
    PlaybackStatus,
};
#[cfg(feature = "playback")]
pub use rodio_output::RodioOutput;
pub use store::AudioStore;
pub use tts::SpeechSynthesizer;
pub use types::*;
