//! Schema migrations, embedded at compile time.
//!
//! Each migration runs once, inside its own transaction together with the
//! row that records it in `_voxa_migrations`.

use rusqlite::Connection;
use std::collections::HashSet;
use thiserror::Error;

/// `(name, sql)` in application order. Append only.
const MIGRATIONS: &[(&str, &str)] = &[
    ("000_init", include_str!("migrations/000_init.sql")),
    ("001_users", include_str!("migrations/001_users.sql")),
    ("002_agents", include_str!("migrations/002_agents.sql")),
    ("003_conversations", include_str!("migrations/003_conversations.sql")),
];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS _voxa_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to read applied migrations: {0}")]
    StateQuery(#[source] rusqlite::Error),
}

/// Applies every pending migration and returns how many ran.
///
/// # Errors
///
/// Returns `MigrationError` if the tracking table cannot be read or a
/// migration fails; a failed migration leaves no partial schema behind.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply(conn, MIGRATIONS)
}

fn applied_names(conn: &Connection) -> Result<HashSet<String>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT name FROM _voxa_migrations")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(names)
}

fn apply_one(conn: &Connection, name: &str, sql: &str) -> Result<(), rusqlite::Error> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(sql)?;
    tx.execute("INSERT INTO _voxa_migrations (name) VALUES (?1)", [name])?;
    tx.commit()
}

fn apply(conn: &Connection, migrations: &[(&str, &str)]) -> Result<usize, MigrationError> {
    conn.execute_batch(TRACKING_TABLE)
        .map_err(|source| MigrationError::ExecutionFailed {
            name: "_voxa_migrations".to_string(),
            source,
        })?;
    let done = applied_names(conn).map_err(MigrationError::StateQuery)?;

    let mut applied = 0;
    for (name, sql) in migrations.iter().filter(|(name, _)| !done.contains(*name)) {
        tracing::info!(migration = name, "applying migration");
        apply_one(conn, name, sql).map_err(|source| MigrationError::ExecutionFailed {
            name: name.to_string(),
            source,
        })?;
        applied += 1;
    }

    if applied == 0 {
        tracing::debug!("schema up to date");
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )
        .expect("should query sqlite_master")
    }

    #[test]
    fn fresh_database_gets_every_migration() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());

        let recorded: usize = conn
            .query_row("SELECT COUNT(*) FROM _voxa_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(recorded, MIGRATIONS.len());
        for table in ["users", "agents", "conversations"] {
            assert!(table_exists(&conn, table), "{table} table should exist");
        }
    }

    #[test]
    fn second_run_applies_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    #[test]
    fn failed_migration_leaves_no_schema_behind() {
        let conn = Connection::open_in_memory().unwrap();
        // Recording the name twice violates the UNIQUE constraint after the
        // CREATE TABLE has already run inside the transaction.
        let migrations = [(
            "001_conflict",
            "CREATE TABLE rollback_probe (id INTEGER PRIMARY KEY);
             INSERT INTO _voxa_migrations (name) VALUES ('001_conflict');",
        )];

        match apply(&conn, &migrations) {
            Err(MigrationError::ExecutionFailed { name, .. }) => assert_eq!(name, "001_conflict"),
            other => panic!("expected execution failure, got {other:?}"),
        }
        assert!(!table_exists(&conn, "rollback_probe"));
    }

    #[test]
    fn conversation_role_is_constrained() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO agents (name, system_prompt) VALUES ('helper', 'Be helpful.')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO conversations (session_id, agent_id, role, content) VALUES ('s', 1, 'tool', 'x')",
            [],
        );
        assert!(result.is_err(), "unknown roles should be rejected");
    }
}
