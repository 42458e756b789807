//! Voice providers for Voxa.
//!
//! Each stage of the voice pipeline sits behind a trait so the server can
//! hold provider handles without caring how they are backed:
//!
//! - [`SpeechToText`]: local whisper.cpp ([`WhisperCliStt`]) or an
//!   OpenAI-compatible hosted endpoint ([`CloudStt`]), composed by
//!   [`SttPolicy`] into a primary provider with an optional fallback.
//! - [`LanguageModel`]: OpenAI-compatible chat completions
//!   ([`ChatCompletionsClient`]).
//! - [`TextToSpeech`]: Piper voice profiles or `espeak-ng`
//!   ([`TtsService`]).
//!
//! Providers never retry. Apart from the STT fallback, every failure is
//! returned to the caller as a [`VoiceError`].

pub mod config;
pub mod error;
pub mod fallback;
pub mod llm;
mod process;
pub mod stt;
pub mod tts;
pub mod wav;

pub use config::{LlmConfig, SttConfig, SttProviderConfig, TtsConfig};
pub use error::VoiceError;
pub use fallback::{Attempt, SttPolicy};
pub use llm::{ChatCompletionsClient, LanguageModel};
pub use stt::{CloudStt, SpeechToText, WhisperCliStt};
pub use tts::{TextToSpeech, TtsService};
