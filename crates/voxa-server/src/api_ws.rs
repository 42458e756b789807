//! WebSocket voice endpoint: `GET /ws/{agent_name}`.
//!
//! Protocol:
//! 1. The server sends `ready` once the session exists.
//! 2. Each binary frame from the client is one utterance.
//! 3. For each utterance the server sends `transcription`, `response` and
//!    `audio` (base64), in that order, or a single `error` frame when the
//!    turn fails. A failed turn does not close the connection.
//!
//! Text frames from the client are ignored. The session is removed when the
//! socket closes, however it closes.

use crate::agents::is_valid_agent_name;
use crate::pipeline::PipelineError;
use crate::AppState;
use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, Path, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use voxa_voice::stt::MAX_STT_INPUT_BYTES;

/// Server-to-client notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    Ready { message: String },
    Transcription { text: String },
    Response { text: String },
    /// Base64-encoded WAV.
    Audio { audio: String },
    Error { message: String },
}

/// Hard ceiling on one client message. It sits above the STT input cap so
/// an oversized utterance reaches the pipeline and fails as a turn.
pub const MAX_WS_MESSAGE_BYTES: usize = MAX_STT_INPUT_BYTES + 1024 * 1024;

/// Session ids are unique per connection and carry the agent name for logs.
pub fn new_session_id(agent_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), agent_name)
}

pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_name): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if !is_valid_agent_name(&agent_name) {
        tracing::warn!(agent = %agent_name, "rejecting websocket for invalid agent name");
        return (StatusCode::BAD_REQUEST, "invalid agent name").into_response();
    }

    ws.max_message_size(MAX_WS_MESSAGE_BYTES)
        .max_frame_size(MAX_WS_MESSAGE_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, state, agent_name))
}

type WsSender = SplitSink<WebSocket, AxumMessage>;

/// Serializes and sends one frame. Returns `false` once the client is gone.
async fn send_frame(sender: &mut WsSender, frame: &OutgoingMessage) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("failed to serialize WebSocket frame: {}", e);
            return true;
        }
    };
    sender.send(AxumMessage::Text(json.into())).await.is_ok()
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, agent_name: String) {
    let agent = state.agents.load(&agent_name).await;
    let agent_id = state.log.register_agent(&agent).await;
    let session_id = new_session_id(&agent_name);
    state
        .sessions
        .create(session_id.clone(), agent, agent_id)
        .await;
    tracing::info!(session_id = %session_id, agent = %agent_name, "voice session started");

    let (mut sender, mut receiver) = socket.split();

    let ready = OutgoingMessage::Ready {
        message: format!("Connected to {}. Ready to assist!", agent_name),
    };
    if send_frame(&mut sender, &ready).await {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(session_id = %session_id, "websocket receive error: {}", e);
                    break;
                }
            };

            match msg {
                AxumMessage::Binary(audio) => {
                    if !handle_audio(&state, &session_id, &audio, &mut sender).await {
                        break;
                    }
                }
                AxumMessage::Text(_) => {
                    tracing::warn!(session_id = %session_id, "ignoring text frame; send audio as binary");
                }
                AxumMessage::Close(_) => break,
                // Pings are answered by axum.
                AxumMessage::Ping(_) | AxumMessage::Pong(_) => {}
            }
        }
    }

    state.sessions.delete(&session_id).await;
    tracing::info!(session_id = %session_id, agent = %agent_name, "voice session ended");
}

/// Runs one turn and reports it to the client. Returns `false` when the
/// connection should close.
async fn handle_audio(
    state: &AppState,
    session_id: &str,
    audio: &[u8],
    sender: &mut WsSender,
) -> bool {
    match state
        .pipeline
        .process_audio(&state.sessions, session_id, audio)
        .await
    {
        Ok(output) => {
            let frames = [
                OutgoingMessage::Transcription {
                    text: output.transcription,
                },
                OutgoingMessage::Response { text: output.reply },
                OutgoingMessage::Audio {
                    audio: base64::engine::general_purpose::STANDARD.encode(&output.audio),
                },
            ];
            for frame in &frames {
                if !send_frame(sender, frame).await {
                    return false;
                }
            }
            true
        }
        Err(PipelineError::SessionNotFound(_)) => {
            // Swept while the client was idle; nothing can be processed any more.
            let frame = OutgoingMessage::Error {
                message: "session expired, please reconnect".to_string(),
            };
            send_frame(sender, &frame).await;
            false
        }
        Err(e) => {
            let frame = OutgoingMessage::Error {
                message: e.to_string(),
            };
            send_frame(sender, &frame).await
        }
    }
}
