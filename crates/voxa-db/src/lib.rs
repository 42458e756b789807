//! Database layer for Voxa.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and the query helpers behind the conversation
//! log. The log is append-only: the voice pipeline writes every completed
//! turn here but never reads it back, so in-memory session history stays
//! the single source of truth for prompts.

mod agents;
mod conversations;
mod error;
mod migrations;
mod pool;

pub use agents::{get_agent, upsert_agent, AgentRecord};
pub use conversations::{append_turn, list_session_messages, ConversationEntry};
pub use error::DbError;
pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
