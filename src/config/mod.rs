//! Configuration (layered: defaults < TOML file < environment).
//!
//! The core only consumes configuration. Credentials are validated by
//! [`AniConfig::credentials`] before any network activity.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::audio::types::VoiceSettings;
use crate::error::{AniError, Result};
use crate::util::retry::RetryPolicy;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";
pub const DEFAULT_GREETING: &str = "Hey... you there?";
pub const DEFAULT_FALLBACK_MESSAGE: &str = "Sorry, I'm having trouble speaking right now.";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AniConfig {
    pub generation: GenerationConfig,
    pub synthesis: SynthesisConfig,
    pub audio: AudioConfig,
    pub chat: ChatConfig,
}

/// Text-generation backend settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Attempts per call, including the first. `1` disables retries.
    pub max_attempts: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: 1,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &redact(self.api_key.as_deref()))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Speech-synthesis backend settings.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub api_key: Option<String>,
    pub voice_id: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub voice_settings: VoiceSettings,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            voice_id: None,
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            model_id: DEFAULT_ELEVENLABS_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: 1,
            voice_settings: VoiceSettings::default(),
        }
    }
}

impl fmt::Debug for SynthesisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynthesisConfig")
            .field("api_key", &redact(self.api_key.as_deref()))
            .field("voice_id", &self.voice_id)
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("voice_settings", &self.voice_settings)
            .finish()
    }
}

/// Where synthesized audio is written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Defaults to the system temp directory.
    pub dir: Option<PathBuf>,
}

/// Conversation behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Initial value of the voice-output toggle.
    pub voice_enabled: bool,
    /// Agent turn seeded into a new conversation. Empty disables it.
    pub greeting: Option<String>,
    /// Agent turn appended when generation fails.
    pub fallback_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            voice_enabled: false,
            greeting: Some(DEFAULT_GREETING.to_string()),
            fallback_message: DEFAULT_FALLBACK_MESSAGE.to_string(),
        }
    }
}

/// Validated credentials for both backends.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub generation_api_key: String,
    pub synthesis_api_key: String,
    pub voice_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("generation_api_key", &redact(Some(&self.generation_api_key)))
            .field("synthesis_api_key", &redact(Some(&self.synthesis_api_key)))
            .field("voice_id", &self.voice_id)
            .finish()
    }
}

fn redact(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "<redacted>",
        _ => "<unset>",
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AniConfig {
    /// Defaults overlaid with environment variables (and `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        config.apply_env_from(|key| std::env::var(key).ok());
        config
    }

    /// Parse a TOML document. Environment is not consulted.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a TOML file, then overlay environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            AniError::Configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        let _ = dotenvy::dotenv();
        let mut config = Self::from_toml_str(&source)?;
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load the per-user config file if it exists, else environment only.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::from_env()),
        }
    }

    /// `<config dir>/ani/config.toml` for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "ani")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Overlay values from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.generation.api_key = Some(key);
        }
        if let Some(url) = lookup("ANI_GEMINI_BASE_URL") {
            self.generation.base_url = url;
        }
        if let Some(model) = lookup("ANI_GEMINI_MODEL") {
            self.generation.model = model;
        }
        if let Some(key) = lookup("ELEVENLABS_API_KEY") {
            self.synthesis.api_key = Some(key);
        }
        if let Some(voice) = lookup("ELEVENLABS_VOICE_ID") {
            self.synthesis.voice_id = Some(voice);
        }
        if let Some(url) = lookup("ANI_ELEVENLABS_BASE_URL") {
            self.synthesis.base_url = url;
        }
        if let Some(dir) = lookup("ANI_AUDIO_DIR") {
            self.audio.dir = Some(PathBuf::from(dir));
        }
        if let Some(flag) = lookup("ANI_VOICE").as_deref().and_then(parse_bool) {
            self.chat.voice_enabled = flag;
        }
    }

    /// All three credentials, or a configuration error naming what is missing.
    pub fn credentials(&self) -> Result<Credentials> {
        let generation_api_key = non_blank(self.generation.api_key.as_ref());
        let synthesis_api_key = non_blank(self.synthesis.api_key.as_ref());
        let voice_id = non_blank(self.synthesis.voice_id.as_ref());

        let mut missing = Vec::new();
        if generation_api_key.is_none() {
            missing.push("GEMINI_API_KEY");
        }
        if synthesis_api_key.is_none() {
            missing.push("ELEVENLABS_API_KEY");
        }
        if voice_id.is_none() {
            missing.push("ELEVENLABS_VOICE_ID");
        }

        match (generation_api_key, synthesis_api_key, voice_id) {
            (Some(generation_api_key), Some(synthesis_api_key), Some(voice_id)) => {
                Ok(Credentials {
                    generation_api_key,
                    synthesis_api_key,
                    voice_id,
                })
            }
            _ => Err(AniError::Configuration(format!(
                "Missing required credentials: {}",
                missing.join(", ")
            ))),
        }
    }

    /// Seed greeting, if enabled.
    pub fn greeting(&self) -> Option<&str> {
        self.chat
            .greeting
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.audio.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_attempts)
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_attempts)
    }
}
