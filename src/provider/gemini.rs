//! Google Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{GenerationConfig, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::error::AniError;
use crate::persona::SYSTEM_INSTRUCTION;
use crate::types::{Conversation, Sender};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

use super::http::{ensure_success, send, shared_client, trim_trailing_slash};
use super::TextGenerator;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Stateless Gemini client. Holds only static settings; the API key is passed
/// per call.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    system_instruction: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::new_with_base_url(DEFAULT_GEMINI_BASE_URL)
    }

    pub fn new_with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::none(),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new_with_base_url(config.base_url.clone())
            .with_model(config.model.clone())
            .with_timeout(config.timeout())
            .with_retry_policy(config.retry_policy())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Request body: chronological `contents` plus the persona instruction.
    pub fn build_request_body(&self, history: &Conversation) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = history
            .iter()
            .map(|turn| {
                serde_json::json!({
                    "role": gemini_role(turn.sender),
                    "parts": [{ "text": turn.text }],
                })
            })
            .collect();

        serde_json::json!({
            "contents": contents,
            "systemInstruction": {
                "parts": [{ "text": self.system_instruction }],
            },
        })
    }

    fn validate(&self, history: &Conversation, api_key: &str) -> Result<(), AniError> {
        if api_key.trim().is_empty() {
            return Err(AniError::Configuration(
                "Missing Gemini API key for text generation".into(),
            ));
        }
        if history.is_empty() {
            return Err(AniError::InvalidArgument(
                "Conversation history cannot be empty".into(),
            ));
        }
        Ok(())
    }

    async fn generate_once(
        &self,
        body: &serde_json::Value,
        api_key: &str,
    ) -> Result<String, AniError> {
        let url = format!(
            "{}/models/{}:generateContent",
            trim_trailing_slash(&self.base_url),
            self.model
        );

        with_timeout(self.timeout, async {
            let response = send(
                shared_client()
                    .post(&url)
                    .query(&[("key", api_key)])
                    .json(body),
            )
            .await?;
            let response = ensure_success(response).await?;
            let text = response
                .text()
                .await
                .map_err(|e| AniError::Network(e.without_url()))?;
            extract_reply(&text)
        })
        .await
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_reply(
        &self,
        history: &Conversation,
        api_key: &str,
    ) -> Result<String, AniError> {
        self.validate(history, api_key)?;
        let body = self.build_request_body(history);

        debug!(model = %self.model, turns = history.len(), "Gemini generateContent");

        self.retry_policy
            .execute(|| self.generate_once(&body, api_key))
            .await
            .map_err(|err| {
                warn!(model = %self.model, error = %err, "Gemini generation failed");
                AniError::Generation(err.to_string())
            })
    }
}

fn gemini_role(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "user",
        Sender::Agent => "model",
    }
}

/// `candidates[0].content.parts[0].text`, required and non-blank.
fn extract_reply(body: &str) -> Result<String, AniError> {
    let data: GeminiResponse = serde_json::from_str(body)?;

    let text = data
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .filter(|text| !text.trim().is_empty());

    text.ok_or_else(|| {
        AniError::InvalidState("Gemini response has no text in the first candidate".into())
    })
}

// Internal Gemini response types

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
