use crate::config::{TtsConfig, TtsKind};
use crate::error::VoiceError;
use crate::wav::{pcm16_to_wav, strip_wav_header};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::RwLock;
use voxa_types::voice::{VoiceModel, VoiceProfile};

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion from
/// oversized synthesis requests.
pub const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Sample rate `espeak-ng` renders at.
const ESPEAK_SAMPLE_RATE: u32 = 22_050;

/// Accepted profile sample rates, in Hz.
const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 1_000..=384_000;

/// Checks a profile before it is registered, so a bad profile fails at
/// start-up instead of mid-turn.
pub fn validate_profile(profile: &VoiceProfile) -> Result<(), VoiceError> {
    if !profile.speed.is_finite() || !(0.1..=10.0).contains(&profile.speed) {
        return Err(VoiceError::Config(format!(
            "voice '{}': speed must be between 0.1 and 10.0, got {}",
            profile.id, profile.speed
        )));
    }
    if !SAMPLE_RATE_RANGE.contains(&profile.sample_rate) {
        return Err(VoiceError::Config(format!(
            "voice '{}': sample_rate must be between {} and {} Hz, got {}",
            profile.id,
            SAMPLE_RATE_RANGE.start(),
            SAMPLE_RATE_RANGE.end(),
            profile.sample_rate
        )));
    }
    Ok(())
}

/// Renders text to audio.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Renders the full utterance and returns a WAV file. `voice` is the
    /// agent's voice id.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, VoiceError>;
}

/// Profile-based speech synthesis backed by local binaries.
#[derive(Debug, Clone)]
pub struct TtsService {
    profiles: Arc<RwLock<HashMap<String, VoiceProfile>>>,
    voices_dir: PathBuf,
    piper_binary: PathBuf,
    espeak_binary: PathBuf,
    default_voice: String,
    force_system: bool,
    timeout: Duration,
}

impl TtsService {
    /// Creates a new `TtsService` with the given voices directory and piper binary path.
    pub fn new(voices_dir: impl AsRef<Path>, piper_binary: impl AsRef<Path>) -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            voices_dir: voices_dir.as_ref().to_path_buf(),
            piper_binary: piper_binary.as_ref().to_path_buf(),
            espeak_binary: PathBuf::from("espeak-ng"),
            default_voice: voxa_types::DEFAULT_VOICE.to_string(),
            force_system: false,
            timeout: Duration::from_secs(60),
        }
    }

    /// Builds the service and registers the configured profiles.
    pub async fn from_config(config: &TtsConfig) -> Result<Self, VoiceError> {
        let kind = TtsKind::parse(&config.kind)?;
        let mut service = Self::new(&config.voices_dir, &config.piper_binary)
            .with_default_voice(&config.default_voice)
            .with_timeout(Duration::from_secs(config.timeout_seconds.max(1)));
        service.force_system = kind == TtsKind::System;

        if config.profiles.is_empty() && kind == TtsKind::Piper {
            service
                .add_profile(VoiceProfile {
                    id: config.default_voice.clone(),
                    ..VoiceProfile::default()
                })
                .await?;
        }
        for profile in &config.profiles {
            service.add_profile(profile.clone()).await?;
        }
        Ok(service)
    }

    pub fn with_default_voice(mut self, voice: impl Into<String>) -> Self {
        self.default_voice = voice.into();
        self
    }

    pub fn with_espeak_binary(mut self, binary: impl AsRef<Path>) -> Self {
        self.espeak_binary = binary.as_ref().to_path_buf();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a voice profile to the service.
    ///
    /// # Errors
    ///
    /// Returns `VoiceError::Config` if the profile fails [`validate_profile`].
    pub async fn add_profile(&self, profile: VoiceProfile) -> Result<(), VoiceError> {
        validate_profile(&profile)?;
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
        Ok(())
    }

    /// Retrieves a voice profile by ID.
    pub async fn get_profile(&self, id: &str) -> Option<VoiceProfile> {
        self.profiles.read().await.get(id).cloned()
    }

    /// Resolves the profile for `voice`, falling back to the default voice.
    async fn resolve_profile(&self, voice: &str) -> Result<VoiceProfile, VoiceError> {
        if self.force_system {
            return Ok(VoiceProfile {
                id: voice.to_string(),
                model: VoiceModel::System,
                ..VoiceProfile::default()
            });
        }

        let profiles = self.profiles.read().await;
        if let Some(profile) = profiles.get(voice) {
            return Ok(profile.clone());
        }
        if let Some(profile) = profiles.get(&self.default_voice) {
            tracing::debug!(voice, default = %self.default_voice, "voice has no profile, using default");
            return Ok(profile.clone());
        }
        Err(VoiceError::Synthesis(format!(
            "voice profile not found: {}",
            voice
        )))
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.voices_dir.join(path)
        }
    }

    async fn synthesize_piper(
        &self,
        text: &str,
        profile: &VoiceProfile,
    ) -> Result<Vec<u8>, VoiceError> {
        let model_path = self.resolve_path(&profile.model_path);
        if !model_path.exists() {
            return Err(VoiceError::Synthesis(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        let mut command = Command::new(&self.piper_binary);
        command
            .arg("--model")
            .arg(model_path)
            .arg("--output_raw")
            // Length scale is the inverse of speed.
            .arg("--length_scale")
            .arg((1.0 / profile.speed).to_string());

        if let Some(config) = &profile.config_path {
            command.arg("--config").arg(self.resolve_path(config));
        }

        if let Some(speaker) = profile.speaker_id {
            command.arg("--speaker").arg(speaker.to_string());
        }

        let pcm = crate::process::run(
            command,
            "piper",
            Some(text.as_bytes().to_vec()),
            self.timeout,
        )
        .await
        .map_err(VoiceError::Synthesis)?;

        Ok(pcm16_to_wav(&pcm, profile.sample_rate))
    }

    /// `espeak-ng` reads the text from stdin so that text beginning with `-`
    /// is never parsed as a flag.
    async fn synthesize_system(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        let mut command = Command::new(&self.espeak_binary);
        command.arg("--stdout");

        let wav = crate::process::run(
            command,
            "espeak-ng",
            Some(text.as_bytes().to_vec()),
            self.timeout,
        )
        .await
        .map_err(VoiceError::Synthesis)?;

        Ok(pcm16_to_wav(strip_wav_header(&wav), ESPEAK_SAMPLE_RATE))
    }
}

#[async_trait]
impl TextToSpeech for TtsService {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::Synthesis("nothing to synthesize".to_string()));
        }
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Synthesis(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }

        let profile = self.resolve_profile(voice).await?;
        let audio = match profile.model {
            VoiceModel::Piper => self.synthesize_piper(text, &profile).await?,
            VoiceModel::System => self.synthesize_system(text).await?,
        };
        tracing::debug!(voice = %profile.id, bytes = audio.len(), "synthesized speech");
        Ok(audio)
    }
}
