//! Append-only conversation log.

use crate::error::DbError;
use rusqlite::{params, Connection};
use voxa_types::{ChatMessage, Role};

/// A persisted conversation entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationEntry {
    pub id: i64,
    pub session_id: String,
    pub agent_id: i64,
    pub message: ChatMessage,
    pub created_at: String,
}

/// Records one completed turn: the user text followed by the assistant reply.
///
/// Both rows are written in a single transaction so a turn is either fully
/// logged or not at all.
pub fn append_turn(
    conn: &Connection,
    session_id: &str,
    agent_id: i64,
    user_text: &str,
    assistant_text: &str,
) -> Result<(), DbError> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO conversations (session_id, agent_id, role, content) VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![session_id, agent_id, Role::User.as_str(), user_text])?;
        stmt.execute(params![
            session_id,
            agent_id,
            Role::Assistant.as_str(),
            assistant_text
        ])?;
    }
    tx.commit()?;
    Ok(())
}

/// Lists the logged messages of a session in insertion order.
pub fn list_session_messages(
    conn: &Connection,
    session_id: &str,
) -> Result<Vec<ConversationEntry>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, agent_id, role, content, created_at
         FROM conversations WHERE session_id = ?1 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map([session_id], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, session_id, agent_id, role, content, created_at) = row?;
        let role = role
            .parse::<Role>()
            .map_err(|e| DbError::InvalidData(e.to_string()))?;
        entries.push(ConversationEntry {
            id,
            session_id,
            agent_id,
            message: ChatMessage::new(role, content),
            created_at,
        });
    }
    Ok(entries)
}
