//! Append-only conversation log backed by SQLite.
//!
//! Every method here swallows its errors after logging them: losing a log
//! row must never fail a voice turn.

use voxa_db::DbPool;
use voxa_types::AgentConfig;

#[derive(Clone)]
pub struct ConversationLog {
    pool: DbPool,
}

impl ConversationLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Upserts the agent row and returns its id.
    pub async fn register_agent(&self, agent: &AgentConfig) -> Option<i64> {
        let pool = self.pool.clone();
        let agent = agent.clone();
        let name = agent.name.clone();

        let res = tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| format!("pool error: {}", e))?;
            voxa_db::upsert_agent(&conn, &agent).map_err(|e| format!("db error: {}", e))
        })
        .await;

        match res {
            Ok(Ok(id)) => Some(id),
            Ok(Err(e)) => {
                tracing::warn!(agent = %name, "failed to register agent: {}", e);
                None
            }
            Err(e) => {
                tracing::error!(agent = %name, "register agent join error: {}", e);
                None
            }
        }
    }

    /// Appends one completed turn.
    pub async fn record_turn(
        &self,
        session_id: &str,
        agent_id: i64,
        user_text: &str,
        reply: &str,
    ) {
        let pool = self.pool.clone();
        let sid = session_id.to_string();
        let user_text = user_text.to_string();
        let reply = reply.to_string();

        let res = tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| format!("pool error: {}", e))?;
            voxa_db::append_turn(&conn, &sid, agent_id, &user_text, &reply)
                .map_err(|e| format!("db error: {}", e))
        })
        .await;

        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(session_id = %session_id, "failed to log conversation turn: {}", e);
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, "conversation log join error: {}", e);
            }
        }
    }

    /// Round-trips a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> bool {
        let pool = self.pool.clone();
        let res = tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| e.to_string())?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| e.to_string())
        })
        .await;

        match res {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::warn!("database health check failed: {}", e);
                false
            }
            Err(e) => {
                tracing::error!("database health check join error: {}", e);
                false
            }
        }
    }
}
