use thiserror::Error;

/// Errors returned by the query helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid stored value: {0}")]
    InvalidData(String),
}
