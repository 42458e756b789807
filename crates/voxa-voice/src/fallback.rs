//! Two-tier STT policy.
//!
//! The primary provider is tried first. If a secondary is configured, any
//! primary failure is logged and the secondary is tried; when the secondary
//! also fails its error is the one returned. Without a secondary the
//! primary's error surfaces unchanged.

use crate::config::SttConfig;
use crate::error::VoiceError;
use crate::stt::{build_provider, SpeechToText};
use async_trait::async_trait;
use std::sync::Arc;

/// Outcome of one provider attempt.
#[derive(Debug)]
pub enum Attempt {
    /// The provider produced a transcription.
    Ok(String),
    /// The provider failed and another provider remains.
    Retry(VoiceError),
    /// The provider failed and nothing remains to try.
    Fatal(VoiceError),
}

/// STT provider selection: a primary handle and an optional fallback.
#[derive(Clone)]
pub struct SttPolicy {
    primary: Arc<dyn SpeechToText>,
    secondary: Option<Arc<dyn SpeechToText>>,
}

impl SttPolicy {
    /// A policy with a single, fixed provider.
    pub fn single(primary: Arc<dyn SpeechToText>) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    /// A policy that falls back to `secondary` when `primary` fails.
    pub fn with_fallback(primary: Arc<dyn SpeechToText>, secondary: Arc<dyn SpeechToText>) -> Self {
        Self {
            primary,
            secondary: Some(secondary),
        }
    }

    /// Builds the policy from configuration.
    pub fn from_config(config: &SttConfig) -> Result<Self, VoiceError> {
        let primary = build_provider(&config.primary)?;
        match &config.secondary {
            Some(secondary) => Ok(Self::with_fallback(primary, build_provider(secondary)?)),
            None => Ok(Self::single(primary)),
        }
    }

    pub fn has_fallback(&self) -> bool {
        self.secondary.is_some()
    }

    /// Runs the primary provider and classifies the result.
    pub async fn attempt_primary(&self, audio: &[u8]) -> Attempt {
        match self.primary.transcribe(audio).await {
            Ok(text) => Attempt::Ok(text),
            Err(e) if self.secondary.is_some() => Attempt::Retry(e),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

#[async_trait]
impl SpeechToText for SttPolicy {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        match self.attempt_primary(audio).await {
            Attempt::Ok(text) => Ok(text),
            Attempt::Fatal(e) => Err(e),
            Attempt::Retry(primary_err) => {
                let Some(secondary) = &self.secondary else {
                    return Err(primary_err);
                };
                tracing::warn!(
                    primary = self.primary.name(),
                    secondary = secondary.name(),
                    "primary STT provider failed, falling back: {}",
                    primary_err
                );
                secondary.transcribe(audio).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        result: Result<&'static str, &'static str>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn ok(name: &'static str, text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Ok(text),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &'static str, msg: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                result: Err(msg),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SpeechToText for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn transcribe(&self, _audio: &[u8]) -> Result<String, VoiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .map(str::to_string)
                .map_err(|m| VoiceError::Transcription(m.to_string()))
        }
    }

    #[tokio::test]
    async fn failing_primary_falls_back_to_secondary() {
        let primary = Fixed::failing("primary", "unreachable");
        let secondary = Fixed::ok("secondary", "hello from backup");
        let policy = SttPolicy::with_fallback(primary.clone(), secondary.clone());

        let text = policy.transcribe(b"audio").await.unwrap();
        assert_eq!(text, "hello from backup");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_failing_propagates_secondary_error() {
        let policy = SttPolicy::with_fallback(
            Fixed::failing("primary", "primary down"),
            Fixed::failing("secondary", "secondary down"),
        );

        match policy.transcribe(b"audio").await {
            Err(VoiceError::Transcription(msg)) => assert_eq!(msg, "secondary down"),
            other => panic!("expected secondary error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn successful_primary_skips_secondary() {
        let secondary = Fixed::ok("secondary", "unused");
        let policy = SttPolicy::with_fallback(Fixed::ok("primary", "first"), secondary.clone());

        assert_eq!(policy.transcribe(b"audio").await.unwrap(), "first");
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_provider_failure_is_fatal() {
        let policy = SttPolicy::single(Fixed::failing("only", "offline"));
        assert!(!policy.has_fallback());

        match policy.attempt_primary(b"audio").await {
            Attempt::Fatal(VoiceError::Transcription(msg)) => assert_eq!(msg, "offline"),
            other => panic!("expected fatal attempt, got {:?}", other),
        }
        assert!(policy.transcribe(b"audio").await.is_err());
    }

    #[tokio::test]
    async fn primary_failure_with_fallback_is_retry() {
        let policy = SttPolicy::with_fallback(
            Fixed::failing("primary", "offline"),
            Fixed::ok("secondary", "ok"),
        );
        assert!(matches!(
            policy.attempt_primary(b"audio").await,
            Attempt::Retry(_)
        ));
    }
}
