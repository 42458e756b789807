//! Stub providers and a test server shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use voxa_server::agents::AgentLoader;
use voxa_server::persistence::ConversationLog;
use voxa_server::pipeline::Pipeline;
use voxa_server::session::SessionStore;
use voxa_server::{app, AppState, Components};
use voxa_types::ChatMessage;
use voxa_voice::{LanguageModel, SpeechToText, TextToSpeech, VoiceError};

/// Transcribes audio by reading it as UTF-8. `FAIL` fails the call.
pub struct Utf8Stt;

#[async_trait]
impl SpeechToText for Utf8Stt {
    fn name(&self) -> &str {
        "utf8"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, VoiceError> {
        let text = String::from_utf8_lossy(audio).to_string();
        if text == "FAIL" {
            return Err(VoiceError::Transcription("stub stt failure".to_string()));
        }
        Ok(text)
    }
}

/// A generation call as seen by the model.
#[derive(Debug, Clone)]
pub struct LlmCall {
    pub messages: Vec<ChatMessage>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
}

/// Replies `reply to: <last user text>` and records every call.
/// A last user text of `LLM_FAIL` fails the call.
#[derive(Default)]
pub struct RecordingLlm {
    pub calls: Mutex<Vec<LlmCall>>,
}

impl RecordingLlm {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<LlmCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for RecordingLlm {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        temperature: Option<f32>,
    ) -> Result<String, VoiceError> {
        self.calls.lock().unwrap().push(LlmCall {
            messages: messages.to_vec(),
            system_prompt: system_prompt.map(str::to_string),
            temperature,
        });
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        if last == "LLM_FAIL" {
            return Err(VoiceError::Generation("stub llm failure".to_string()));
        }
        Ok(format!("reply to: {}", last))
    }
}

/// Returns `voice|text` as the audio bytes. Fails when the text contains
/// `TTS_FAIL`.
#[derive(Default)]
pub struct EchoTts {
    pub calls: AtomicUsize,
}

pub fn stub_audio(voice: &str, text: &str) -> Vec<u8> {
    format!("{}|{}", voice, text).into_bytes()
}

#[async_trait]
impl TextToSpeech for EchoTts {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("TTS_FAIL") {
            return Err(VoiceError::Synthesis("stub tts failure".to_string()));
        }
        Ok(stub_audio(voice, text))
    }
}

pub struct Stubs {
    pub llm: Arc<RecordingLlm>,
    pub tts: Arc<EchoTts>,
}

/// Pool on a temporary file; `:memory:` would give every pooled
/// connection its own database.
pub fn test_pool() -> (tempfile::TempDir, voxa_db::DbPool) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("voxa-test.db");
    let pool =
        voxa_db::create_pool(path.to_str().unwrap(), voxa_db::DbRuntimeSettings::default())
            .unwrap();
    {
        let conn = pool.get().unwrap();
        voxa_db::run_migrations(&conn).unwrap();
    }
    (dir, pool)
}

pub fn stub_pipeline(max_history: usize, log: Option<ConversationLog>) -> (Pipeline, Stubs) {
    let llm = Arc::new(RecordingLlm::default());
    let tts = Arc::new(EchoTts::default());
    let pipeline = Pipeline::new(Arc::new(Utf8Stt), llm.clone(), tts.clone(), max_history);
    let pipeline = match log {
        Some(log) => pipeline.with_log(log),
        None => pipeline,
    };
    (pipeline, Stubs { llm, tts })
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub sessions: SessionStore,
    pub pool: voxa_db::DbPool,
    pub stubs: Stubs,
    _db_dir: tempfile::TempDir,
}

/// Serves the full router with stub providers on an ephemeral port.
pub async fn spawn_server(agents_dir: &Path, max_history: usize) -> TestServer {
    let (db_dir, pool) = test_pool();
    let log = ConversationLog::new(pool.clone());
    let (pipeline, stubs) = stub_pipeline(max_history, Some(log.clone()));
    let sessions = SessionStore::new();

    let state = AppState {
        pool: pool.clone(),
        sessions: sessions.clone(),
        agents: AgentLoader::new(agents_dir),
        pipeline,
        log,
        components: Components {
            stt: "utf8".to_string(),
            llm: "recording".to_string(),
            tts: "echo".to_string(),
        },
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestServer {
        addr,
        sessions,
        pool,
        stubs,
        _db_dir: db_dir,
    }
}
