use thiserror::Error;

/// Errors raised by the voice providers.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
