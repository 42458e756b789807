//! In-memory session store.
//!
//! Locking discipline: the map lock is only held for map operations
//! (insert, lookup, remove) and never across an `.await` on anything else.
//! Each session sits behind its own `tokio::sync::Mutex`, which a voice turn
//! holds from transcription to reply, so turns on one session run strictly
//! one at a time while other sessions proceed independently. Listing reads
//! only what the store keeps beside each handle and never waits on a turn.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use voxa_types::{AgentConfig, ChatMessage};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Conversation state for one connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub agent: AgentConfig,
    /// Row id of the agent in the conversation log, when it was registered.
    pub agent_id: Option<i64>,
    /// Completed turns, alternating user and assistant entries.
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    last_active: Instant,
    /// Shared with the store so listing does not need the session lock.
    message_count: Arc<AtomicUsize>,
}

impl Session {
    pub fn new(id: impl Into<String>, agent: AgentConfig) -> Self {
        Self {
            id: id.into(),
            agent,
            agent_id: None,
            history: Vec::new(),
            created_at: Utc::now(),
            last_active: Instant::now(),
            message_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent.name
    }

    /// The newest `max` history entries.
    pub fn recent_history(&self, max: usize) -> &[ChatMessage] {
        let start = self.history.len().saturating_sub(max);
        &self.history[start..]
    }

    /// Appends a completed turn: user text first, then the reply.
    pub fn record_turn(&mut self, user_text: impl Into<String>, reply: impl Into<String>) {
        self.history.push(ChatMessage::user(user_text));
        self.history.push(ChatMessage::assistant(reply));
        self.message_count.store(self.history.len(), Ordering::Relaxed);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

/// One row of `GET /api/sessions`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub agent_name: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
}

/// A session handle plus what listing needs without taking its lock.
struct Entry {
    handle: SessionHandle,
    agent_name: String,
    created_at: DateTime<Utc>,
    message_count: Arc<AtomicUsize>,
}

impl Entry {
    fn summary(&self, session_id: &str) -> SessionSummary {
        SessionSummary {
            session_id: session_id.to_string(),
            agent_name: self.agent_name.clone(),
            created_at: self.created_at,
            message_count: self.message_count.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Entry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session, replacing any existing session with the same id.
    pub async fn create(
        &self,
        session_id: impl Into<String>,
        agent: AgentConfig,
        agent_id: Option<i64>,
    ) -> SessionHandle {
        let session_id = session_id.into();
        let mut session = Session::new(session_id.clone(), agent);
        session.agent_id = agent_id;
        let entry = Entry {
            agent_name: session.agent.name.clone(),
            created_at: session.created_at,
            message_count: session.message_count.clone(),
            handle: Arc::new(Mutex::new(session)),
        };
        let handle = entry.handle.clone();

        let replaced = self.sessions.write().await.insert(session_id.clone(), entry);
        if replaced.is_some() {
            tracing::warn!(session_id = %session_id, "replaced existing session");
        }
        handle
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.handle.clone())
    }

    /// Removes a session. Returns `false` if it did not exist.
    pub async fn delete(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Summaries of every live session, oldest first.
    ///
    /// Sessions mid-turn are reported with the count of their last
    /// completed turn.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, entry)| entry.summary(id))
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    /// Removes sessions idle for longer than `max_idle` and returns their ids.
    ///
    /// A session whose lock is held is mid-turn and never counts as idle.
    pub async fn sweep_idle(&self, max_idle: Duration) -> Vec<String> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| {
                entry
                    .handle
                    .try_lock()
                    .map(|session| session.idle_for() > max_idle)
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
        }
        expired
    }
}
