//! Voice turn orchestration: audio in, transcription, reply and speech out.
//!
//! A turn moves through [`TurnState`] strictly in order. Any failure moves
//! it to [`TurnState::Failed`], skips the remaining steps and leaves the
//! session history untouched. Every turn, failed or not, counts as activity
//! for the idle sweep. History is mutated once per successful turn,
//! after synthesis, by appending the user text and then the reply.

use crate::persistence::ConversationLog;
use crate::session::SessionStore;
use std::sync::Arc;
use thiserror::Error;
use voxa_types::ChatMessage;
use voxa_voice::stt::check_input_size;
use voxa_voice::{LanguageModel, SpeechToText, TextToSpeech, VoiceError};

/// Spoken back when the transcription has no words in it.
pub const EMPTY_TRANSCRIPTION_REPLY: &str = "I didn't hear anything. Could you please repeat?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Transcribing,
    Generating,
    Synthesizing,
    Responded,
    Failed,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error(transparent)]
    Voice(#[from] VoiceError),
}

/// Everything a successful turn sends back to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    /// Empty when nothing was heard.
    pub transcription: String,
    pub reply: String,
    pub audio: Vec<u8>,
}

#[derive(Clone)]
pub struct Pipeline {
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn LanguageModel>,
    tts: Arc<dyn TextToSpeech>,
    max_history: usize,
    log: Option<ConversationLog>,
}

impl Pipeline {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn LanguageModel>,
        tts: Arc<dyn TextToSpeech>,
        max_history: usize,
    ) -> Self {
        Self {
            stt,
            llm,
            tts,
            max_history,
            log: None,
        }
    }

    pub fn with_log(mut self, log: ConversationLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Runs one turn for `session_id`.
    ///
    /// The session lock is held for the whole turn, so a second turn on the
    /// same session waits for this one to finish.
    pub async fn process_audio(
        &self,
        sessions: &SessionStore,
        session_id: &str,
        audio: &[u8],
    ) -> Result<TurnOutput, PipelineError> {
        let handle = sessions
            .get(session_id)
            .await
            .ok_or_else(|| PipelineError::SessionNotFound(session_id.to_string()))?;
        let mut session = handle.lock().await;

        let mut state = TurnState::Received;
        tracing::debug!(session_id = %session_id, bytes = audio.len(), ?state, "audio received");

        let result = async {
            advance(&mut state, TurnState::Transcribing, session_id);
            check_input_size(audio)?;
            let transcription = self.stt.transcribe(audio).await?.trim().to_string();

            let reply = if transcription.is_empty() {
                tracing::info!(session_id = %session_id, "empty transcription, skipping generation");
                EMPTY_TRANSCRIPTION_REPLY.to_string()
            } else {
                advance(&mut state, TurnState::Generating, session_id);
                let mut messages: Vec<ChatMessage> =
                    session.recent_history(self.max_history).to_vec();
                messages.push(ChatMessage::user(&transcription));
                self.llm
                    .generate(
                        &messages,
                        session.agent.system_prompt(),
                        Some(session.agent.clamped_temperature()),
                    )
                    .await?
            };

            advance(&mut state, TurnState::Synthesizing, session_id);
            let audio = self.tts.synthesize(&reply, &session.agent.voice).await?;

            Ok::<_, VoiceError>(TurnOutput {
                transcription,
                reply,
                audio,
            })
        }
        .await;

        match result {
            Ok(output) => {
                if output.transcription.is_empty() {
                    session.touch();
                } else {
                    session.record_turn(output.transcription.clone(), output.reply.clone());
                    if let (Some(log), Some(agent_id)) = (&self.log, session.agent_id) {
                        log.record_turn(session_id, agent_id, &output.transcription, &output.reply)
                            .await;
                    }
                }
                advance(&mut state, TurnState::Responded, session_id);
                tracing::info!(
                    session_id = %session_id,
                    agent = %session.agent_name(),
                    reply_chars = output.reply.len(),
                    audio_bytes = output.audio.len(),
                    "turn complete"
                );
                Ok(output)
            }
            Err(e) => {
                session.touch();
                let failed_in = state;
                advance(&mut state, TurnState::Failed, session_id);
                tracing::error!(
                    session_id = %session_id,
                    agent = %session.agent_name(),
                    ?failed_in,
                    "turn failed: {}",
                    e
                );
                Err(e.into())
            }
        }
    }
}

fn advance(state: &mut TurnState, next: TurnState, session_id: &str) {
    tracing::trace!(session_id = %session_id, from = ?*state, to = ?next, "turn state");
    *state = next;
}
