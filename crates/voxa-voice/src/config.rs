//! Provider configuration.
//!
//! Provider selection is static: the process builds its provider handles
//! once from these records at start-up. Provider kinds are kept as strings
//! so an unrecognised kind surfaces as [`VoiceError::UnknownProvider`]
//! rather than as a generic parse failure.

use crate::error::VoiceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use voxa_types::voice::VoiceProfile;

/// Default OpenAI-compatible endpoint (Groq).
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_stt_kind() -> String {
    "local".to_string()
}

fn default_whisper_binary() -> String {
    "whisper-cli".to_string()
}

fn default_whisper_model() -> String {
    "models/ggml-base.en.bin".to_string()
}

fn default_cloud_stt_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_llm_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_temperature() -> f32 {
    voxa_types::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    512
}

fn default_tts_kind() -> String {
    "piper".to_string()
}

fn default_piper_binary() -> String {
    "piper".to_string()
}

fn default_voices_dir() -> String {
    "assets/voices".to_string()
}

fn default_voice() -> String {
    voxa_types::DEFAULT_VOICE.to_string()
}

/// Supported STT provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttKind {
    /// whisper.cpp-compatible binary run against a temporary file.
    Local,
    /// OpenAI-compatible `/audio/transcriptions` endpoint.
    Cloud,
}

impl SttKind {
    pub fn parse(kind: &str) -> Result<Self, VoiceError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "local" | "whisper" => Ok(Self::Local),
            "cloud" | "openai" | "groq" => Ok(Self::Cloud),
            other => Err(VoiceError::UnknownProvider(format!("stt kind '{}'", other))),
        }
    }
}

/// One STT provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct SttProviderConfig {
    #[serde(default = "default_stt_kind")]
    pub kind: String,
    /// Language hint passed to the model.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    // Local
    #[serde(default = "default_whisper_binary")]
    pub binary_path: String,
    #[serde(default = "default_whisper_model")]
    pub model_path: String,

    // Cloud
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_cloud_stt_model")]
    pub model: String,
}

impl Default for SttProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_stt_kind(),
            language: default_language(),
            timeout_seconds: default_timeout_seconds(),
            binary_path: default_whisper_binary(),
            model_path: default_whisper_model(),
            base_url: default_api_base(),
            api_key: String::new(),
            model: default_cloud_stt_model(),
        }
    }
}

impl fmt::Debug for SttProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SttProviderConfig")
            .field("kind", &self.kind)
            .field("language", &self.language)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("binary_path", &self.binary_path)
            .field("model_path", &self.model_path)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

/// STT selection: a primary provider and an optional fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SttConfig {
    #[serde(default)]
    pub primary: SttProviderConfig,
    /// When absent the primary is the only provider and its errors surface
    /// directly.
    #[serde(default)]
    pub secondary: Option<SttProviderConfig>,
}

/// Chat-completions client settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Process-wide default; agents override it.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base(),
            api_key: String::new(),
            model: default_llm_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Supported TTS provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsKind {
    /// Piper, with per-voice profiles.
    Piper,
    /// `espeak-ng` for every voice.
    System,
}

impl TtsKind {
    pub fn parse(kind: &str) -> Result<Self, VoiceError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "piper" => Ok(Self::Piper),
            "system" | "espeak" | "espeak-ng" => Ok(Self::System),
            other => Err(VoiceError::UnknownProvider(format!("tts kind '{}'", other))),
        }
    }
}

/// TTS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_tts_kind")]
    pub kind: String,
    #[serde(default = "default_piper_binary")]
    pub piper_binary: String,
    #[serde(default = "default_voices_dir")]
    pub voices_dir: String,
    /// Voice used when an agent names a voice with no profile.
    #[serde(default = "default_voice")]
    pub default_voice: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub profiles: Vec<VoiceProfile>,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            kind: default_tts_kind(),
            piper_binary: default_piper_binary(),
            voices_dir: default_voices_dir(),
            default_voice: default_voice(),
            timeout_seconds: default_timeout_seconds(),
            profiles: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kinds_parse_aliases() {
        assert_eq!(SttKind::parse("Cloud").unwrap(), SttKind::Cloud);
        assert_eq!(SttKind::parse("whisper").unwrap(), SttKind::Local);
        assert_eq!(TtsKind::parse("espeak-ng").unwrap(), TtsKind::System);
    }

    #[test]
    fn unknown_kinds_are_rejected() {
        assert!(matches!(
            SttKind::parse("carrier-pigeon"),
            Err(VoiceError::UnknownProvider(_))
        ));
        assert!(matches!(
            TtsKind::parse("gtts"),
            Err(VoiceError::UnknownProvider(_))
        ));
    }

    #[test]
    fn debug_redacts_api_keys() {
        let llm = LlmConfig {
            api_key: "sk-very-secret".to_string(),
            ..LlmConfig::default()
        };
        let stt = SttProviderConfig {
            api_key: "gsk-very-secret".to_string(),
            ..SttProviderConfig::default()
        };
        assert!(!format!("{:?}", llm).contains("very-secret"));
        assert!(!format!("{:?}", stt).contains("very-secret"));
    }

    #[test]
    fn stt_secondary_is_optional() {
        let config: SttConfig = toml::from_str(
            r#"
            [primary]
            kind = "cloud"
            model = "whisper-large-v3-turbo"
            "#,
        )
        .unwrap();
        assert_eq!(config.primary.kind, "cloud");
        assert_eq!(config.primary.language, "en");
        assert!(config.secondary.is_none());
    }
}
