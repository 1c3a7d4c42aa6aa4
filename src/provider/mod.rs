//! Text-generation backends.

pub mod gemini;
pub mod http;

pub use gemini::GeminiClient;

use async_trait::async_trait;

use crate::error::AniError;
use crate::types::Conversation;

/// Produces the next agent reply for a conversation.
///
/// Implementations hold no per-conversation state. Every backend failure is
/// reported as [`AniError::Generation`]; a partial reply is never returned.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply to `history` (chronological, non-empty).
    async fn generate_reply(&self, history: &Conversation, api_key: &str)
        -> Result<String, AniError>;
}
