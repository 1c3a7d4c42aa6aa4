//! ElevenLabs text-to-speech client (`/text-to-speech/{voice_id}`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::store::AudioStore;
use super::tts::SpeechSynthesizer;
use super::types::{AudioClip, VoiceSettings};
use crate::config::{AniConfig, DEFAULT_ELEVENLABS_BASE_URL, DEFAULT_ELEVENLABS_MODEL};
use crate::error::AniError;
use crate::provider::http::{
    ensure_success, error_message, send, shared_client, trim_trailing_slash, xi_api_key_headers,
};
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_timeout;

const AUDIO_MPEG: &str = "audio/mpeg";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// ElevenLabs speech client. Credentials and voice are passed per call.
#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    base_url: String,
    model_id: String,
    voice_settings: VoiceSettings,
    store: AudioStore,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl ElevenLabsClient {
    pub fn new(store: AudioStore) -> Self {
        Self::new_with_base_url(DEFAULT_ELEVENLABS_BASE_URL, store)
    }

    pub fn new_with_base_url(base_url: impl Into<String>, store: AudioStore) -> Self {
        Self {
            base_url: base_url.into(),
            model_id: DEFAULT_ELEVENLABS_MODEL.to_string(),
            voice_settings: VoiceSettings::default(),
            store,
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::none(),
        }
    }

    pub fn from_config(config: &AniConfig) -> Self {
        let synthesis = &config.synthesis;
        Self::new_with_base_url(synthesis.base_url.clone(), AudioStore::new(config.audio_dir()))
            .with_model(synthesis.model_id.clone())
            .with_voice_settings(synthesis.voice_settings)
            .with_timeout(synthesis.timeout())
            .with_retry_policy(synthesis.retry_policy())
    }

    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn with_voice_settings(mut self, voice_settings: VoiceSettings) -> Self {
        self.voice_settings = voice_settings;
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

    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    pub fn build_request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {
                "stability": self.voice_settings.stability,
                "similarity_boost": self.voice_settings.similarity_boost,
                "style": self.voice_settings.style,
                "use_speaker_boost": self.voice_settings.use_speaker_boost,
            },
        })
    }

    fn validate(text: &str, api_key: &str, voice_id: &str) -> Result<(), AniError> {
        if api_key.trim().is_empty() {
            return Err(AniError::Configuration(
                "Missing ElevenLabs API key for speech synthesis".into(),
            ));
        }
        if voice_id.trim().is_empty() {
            return Err(AniError::Configuration("Voice id cannot be empty".into()));
        }
        if text.trim().is_empty() {
            return Err(AniError::InvalidArgument("Speech text cannot be empty".into()));
        }
        Ok(())
    }

    async fn fetch_audio_once(
        &self,
        body: &serde_json::Value,
        api_key: &str,
        voice_id: &str,
    ) -> Result<Vec<u8>, AniError> {
        let url = format!(
            "{}/text-to-speech/{}",
            trim_trailing_slash(&self.base_url),
            voice_id.trim()
        );
        let headers = xi_api_key_headers(api_key, AUDIO_MPEG)?;

        with_timeout(self.timeout, async {
            let response = send(shared_client().post(url).headers(headers).json(body)).await?;
            parse_audio_response(ensure_success(response).await?).await
        })
        .await
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(
        &self,
        text: &str,
        api_key: &str,
        voice_id: &str,
    ) -> Result<AudioClip, AniError> {
        Self::validate(text, api_key, voice_id)?;
        let body = self.build_request_body(text);

        debug!(model = %self.model_id, chars = text.len(), "ElevenLabs text-to-speech");

        let result = async {
            let audio = self
                .retry_policy
                .execute(|| self.fetch_audio_once(&body, api_key, voice_id))
                .await?;
            self.store.save(&audio, AUDIO_MPEG).await
        }
        .await;

        result.map_err(|err| {
            warn!(error = %err, "ElevenLabs synthesis failed");
            AniError::Synthesis(err.to_string())
        })
    }
}

async fn parse_audio_response(response: reqwest::Response) -> Result<Vec<u8>, AniError> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") || content_type.starts_with("text/") {
        let body = response.text().await.unwrap_or_default();
        return Err(AniError::InvalidState(
            error_message(&body)
                .unwrap_or_else(|| format!("Expected audio payload, got '{content_type}'")),
        ));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AniError::Network(e.without_url()))?;
    if bytes.is_empty() {
        return Err(AniError::InvalidState(
            "Speech response contained empty audio payload".into(),
        ));
    }

    Ok(bytes.to_vec())
}
