//! Speech-to-text providers.

use crate::config::{SttKind, SttProviderConfig};
use crate::error::VoiceError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Maximum audio input size for STT (10 MiB). Prevents OOM from oversized payloads.
pub const MAX_STT_INPUT_BYTES: usize = 10 * 1024 * 1024;

/// Converts raw audio to text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Transcribes one utterance. An utterance with no speech yields an
    /// empty string, not an error.
    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError>;
}

/// Rejects utterances larger than [`MAX_STT_INPUT_BYTES`].
pub fn check_input_size(audio: &[u8]) -> Result<(), VoiceError> {
    if audio.len() > MAX_STT_INPUT_BYTES {
        return Err(VoiceError::Transcription(format!(
            "audio data exceeds maximum size: {} bytes (limit: {} bytes)",
            audio.len(),
            MAX_STT_INPUT_BYTES
        )));
    }
    Ok(())
}

/// Local whisper.cpp transcription.
///
/// The audio is written to a temporary `.wav` file which the binary reads
/// with `-f`; the file is removed when the call returns.
#[derive(Debug, Clone)]
pub struct WhisperCliStt {
    binary_path: PathBuf,
    model_path: PathBuf,
    language: String,
    timeout: Duration,
}

impl WhisperCliStt {
    pub fn new(binary_path: impl Into<PathBuf>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
            model_path: model_path.into(),
            language: "en".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SpeechToText for WhisperCliStt {
    fn name(&self) -> &str {
        "whisper-cli"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        check_input_size(audio)?;

        let file = tempfile::Builder::new()
            .prefix("voxa-stt-")
            .suffix(".wav")
            .tempfile()
            .map_err(|e| VoiceError::Transcription(format!("failed to create temp file: {}", e)))?;
        tokio::fs::write(file.path(), audio)
            .await
            .map_err(|e| VoiceError::Transcription(format!("failed to write temp file: {}", e)))?;

        let mut command = Command::new(&self.binary_path);
        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-l")
            .arg(&self.language)
            .arg("-nt") // no timestamps: stdout carries only the text
            .arg("-np")
            .arg("-f")
            .arg(file.path());

        let stdout = crate::process::run(command, "whisper", None, self.timeout)
            .await
            .map_err(VoiceError::Transcription)?;

        let text = join_segments(&String::from_utf8_lossy(&stdout));
        tracing::debug!(bytes = audio.len(), chars = text.len(), "local transcription complete");
        Ok(text)
    }
}

/// Joins whisper's per-segment output lines into one utterance.
fn join_segments(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// OpenAI-compatible hosted transcription (`POST {base_url}/audio/transcriptions`).
#[derive(Clone)]
pub struct CloudStt {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    language: String,
}

impl std::fmt::Debug for CloudStt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudStt")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

impl CloudStt {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            language: language.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechToText for CloudStt {
    fn name(&self) -> &str {
        "cloud"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        check_input_size(audio)?;

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json");

        let mut request = self.client.post(self.endpoint()).multipart(form);
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(format!("request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Transcription(format!(
                "STT API error {}: {}",
                status, body
            )));
        }

        let parsed: TranscriptionResponse = res
            .json()
            .await
            .map_err(|e| VoiceError::Transcription(format!("malformed response: {}", e)))?;
        let text = parsed.text.ok_or_else(|| {
            VoiceError::Transcription("malformed response: missing 'text'".to_string())
        })?;

        Ok(text.trim().to_string())
    }
}

/// Builds one provider handle from its configuration record.
pub fn build_provider(config: &SttProviderConfig) -> Result<Arc<dyn SpeechToText>, VoiceError> {
    let timeout = Duration::from_secs(config.timeout_seconds.max(1));
    match SttKind::parse(&config.kind)? {
        SttKind::Local => Ok(Arc::new(
            WhisperCliStt::new(&config.binary_path, &config.model_path)
                .with_language(&config.language)
                .with_timeout(timeout),
        )),
        SttKind::Cloud => {
            if config.api_key.is_empty() {
                tracing::warn!(base_url = %config.base_url, "cloud STT configured without an API key");
            }
            Ok(Arc::new(CloudStt::new(
                &config.base_url,
                &config.api_key,
                &config.model,
                &config.language,
                timeout,
            )?))
        }
    }
}
