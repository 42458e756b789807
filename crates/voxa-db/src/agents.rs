//! Agent records.
//!
//! Agent configuration is authored as files and loaded by the server; the
//! `agents` table mirrors the configuration in effect so that conversation
//! rows have a stable foreign key.

use crate::error::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use voxa_types::AgentConfig;

/// A stored agent row.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRecord {
    pub id: i64,
    pub name: String,
    pub system_prompt: String,
    pub voice: String,
    pub temperature: f32,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl AgentRecord {
    pub fn to_config(&self) -> AgentConfig {
        AgentConfig {
            name: self.name.clone(),
            system_prompt: self.system_prompt.clone(),
            temperature: self.temperature,
            voice: self.voice.clone(),
        }
    }
}

/// Inserts or refreshes the row for `config.name` and returns its id.
pub fn upsert_agent(conn: &Connection, config: &AgentConfig) -> Result<i64, DbError> {
    let id = conn.query_row(
        "INSERT INTO agents (name, system_prompt, voice, temperature)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
             system_prompt = excluded.system_prompt,
             voice = excluded.voice,
             temperature = excluded.temperature,
             updated_at = datetime('now')
         RETURNING id",
        params![
            config.name,
            config.system_prompt,
            config.voice,
            f64::from(config.temperature)
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Looks up an agent row by name.
pub fn get_agent(conn: &Connection, name: &str) -> Result<Option<AgentRecord>, DbError> {
    let record = conn
        .query_row(
            "SELECT id, name, system_prompt, voice, temperature, created_at, updated_at
             FROM agents WHERE name = ?1",
            [name],
            |row| {
                let temperature: f64 = row.get(4)?;
                Ok(AgentRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    system_prompt: row.get(2)?,
                    voice: row.get(3)?,
                    temperature: temperature as f32,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}
