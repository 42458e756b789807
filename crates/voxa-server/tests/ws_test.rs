//! End-to-end WebSocket tests against the full router with stub providers.

mod common;

use base64::Engine;
use common::{spawn_server, stub_audio};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use voxa_voice::stt::MAX_STT_INPUT_BYTES;

type Ws = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout waiting for frame")
            .expect("connection closed")
            .expect("frame error");
        match frame {
            Message::Text(text) => return serde_json::from_str(&text).expect("invalid JSON frame"),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

async fn connect(addr: std::net::SocketAddr, agent: &str) -> Ws {
    let (ws, _) = connect_async(format!("ws://{}/ws/{}", addr, agent))
        .await
        .expect("failed to connect");
    ws
}

async fn wait_for_sessions(sessions: &voxa_server::session::SessionStore, expected: usize) {
    for _ in 0..100 {
        if sessions.len().await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("expected {} sessions, found {}", expected, sessions.len().await);
}

#[tokio::test]
async fn audio_turn_yields_three_ordered_frames() {
    let agents = tempfile::tempdir().unwrap();
    std::fs::write(
        agents.path().join("concierge.toml"),
        "system_prompt = \"You are a concierge.\"\nvoice = \"warm\"\n",
    )
    .unwrap();
    let server = spawn_server(agents.path(), 20).await;
    let mut ws = connect(server.addr, "concierge").await;

    let ready = next_json(&mut ws).await;
    assert_eq!(ready["type"], "ready");
    assert_eq!(ready["message"], "Connected to concierge. Ready to assist!");

    ws.send(Message::Binary(b"book a table".to_vec().into()))
        .await
        .unwrap();

    let transcription = next_json(&mut ws).await;
    assert_eq!(transcription["type"], "transcription");
    assert_eq!(transcription["text"], "book a table");

    let response = next_json(&mut ws).await;
    assert_eq!(response["type"], "response");
    assert_eq!(response["text"], "reply to: book a table");

    let audio = next_json(&mut ws).await;
    assert_eq!(audio["type"], "audio");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(audio["audio"].as_str().unwrap())
        .unwrap();
    assert_eq!(decoded, stub_audio("warm", "reply to: book a table"));

    let call = server.stubs.llm.last_call().unwrap();
    assert_eq!(call.system_prompt.as_deref(), Some("You are a concierge."));
}

#[tokio::test]
async fn failed_turn_sends_error_and_keeps_connection_open() {
    let agents = tempfile::tempdir().unwrap();
    let server = spawn_server(agents.path(), 20).await;
    let mut ws = connect(server.addr, "helper").await;
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    ws.send(Message::Binary(b"LLM_FAIL".to_vec().into()))
        .await
        .unwrap();
    let error = next_json(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().contains("stub llm failure"));

    ws.send(Message::Binary(b"still there?".to_vec().into()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "transcription");
    assert_eq!(next_json(&mut ws).await["type"], "response");
    assert_eq!(next_json(&mut ws).await["type"], "audio");
}

#[tokio::test]
async fn oversized_audio_is_an_error_frame_not_a_disconnect() {
    let agents = tempfile::tempdir().unwrap();
    let server = spawn_server(agents.path(), 20).await;
    let mut ws = connect(server.addr, "helper").await;
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    let oversized = vec![b'a'; MAX_STT_INPUT_BYTES + 1];
    ws.send(Message::Binary(oversized.into())).await.unwrap();
    let error = next_json(&mut ws).await;
    assert_eq!(error["type"], "error");
    assert!(error["message"]
        .as_str()
        .unwrap()
        .contains("exceeds maximum size"));
    assert_eq!(server.stubs.llm.call_count(), 0);

    ws.send(Message::Binary(b"smaller now".to_vec().into()))
        .await
        .unwrap();
    let transcription = next_json(&mut ws).await;
    assert_eq!(transcription["text"], "smaller now");
}

#[tokio::test]
async fn empty_audio_gets_the_canned_reply() {
    let agents = tempfile::tempdir().unwrap();
    let server = spawn_server(agents.path(), 20).await;
    let mut ws = connect(server.addr, "helper").await;
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    ws.send(Message::Binary(b"   ".to_vec().into())).await.unwrap();

    assert_eq!(next_json(&mut ws).await["text"], "");
    assert_eq!(
        next_json(&mut ws).await["text"],
        "I didn't hear anything. Could you please repeat?"
    );
    assert_eq!(next_json(&mut ws).await["type"], "audio");
    assert_eq!(server.stubs.llm.call_count(), 0);
}

#[tokio::test]
async fn text_frames_are_ignored() {
    let agents = tempfile::tempdir().unwrap();
    let server = spawn_server(agents.path(), 20).await;
    let mut ws = connect(server.addr, "helper").await;
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    ws.send(Message::Text("hello?".to_string().into())).await.unwrap();
    ws.send(Message::Binary(b"hi".to_vec().into())).await.unwrap();

    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "transcription");
    assert_eq!(first["text"], "hi");
}

#[tokio::test]
async fn session_lives_only_as_long_as_the_connection() {
    let agents = tempfile::tempdir().unwrap();
    let server = spawn_server(agents.path(), 20).await;

    let mut first = connect(server.addr, "helper").await;
    let mut second = connect(server.addr, "helper").await;
    assert_eq!(next_json(&mut first).await["type"], "ready");
    assert_eq!(next_json(&mut second).await["type"], "ready");
    wait_for_sessions(&server.sessions, 2).await;

    let ids: Vec<String> = server
        .sessions
        .list()
        .await
        .into_iter()
        .map(|s| s.session_id)
        .collect();
    assert_ne!(ids[0], ids[1]);
    assert!(ids.iter().all(|id| id.ends_with("_helper")));

    first.close(None).await.unwrap();
    wait_for_sessions(&server.sessions, 1).await;

    // Abrupt disconnect.
    drop(second);
    wait_for_sessions(&server.sessions, 0).await;
}

#[tokio::test]
async fn completed_turn_is_persisted() {
    let agents = tempfile::tempdir().unwrap();
    let server = spawn_server(agents.path(), 20).await;
    let mut ws = connect(server.addr, "logger").await;
    assert_eq!(next_json(&mut ws).await["type"], "ready");

    ws.send(Message::Binary(b"remember this".to_vec().into()))
        .await
        .unwrap();
    for _ in 0..3 {
        next_json(&mut ws).await;
    }

    let session_id = server.sessions.list().await[0].session_id.clone();
    let conn = server.pool.get().unwrap();
    let agent = voxa_db::get_agent(&conn, "logger").unwrap().expect("agent row");
    let entries = voxa_db::list_session_messages(&conn, &session_id).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message.content, "remember this");
    assert_eq!(entries[0].agent_id, agent.id);
}

#[tokio::test]
async fn invalid_agent_name_is_rejected() {
    let agents = tempfile::tempdir().unwrap();
    let server = spawn_server(agents.path(), 20).await;

    let result = connect_async(format!("ws://{}/ws/bad.name", server.addr)).await;
    assert!(result.is_err(), "upgrade should be refused");
    assert!(server.sessions.is_empty().await);
}
