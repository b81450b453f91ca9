//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::content::ContentStatus;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// A JSON column could not be encoded or decoded.
    #[error("JSON column error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored value does not parse into its enum or timestamp type.
    #[error("Corrupt {column} value '{value}'")]
    Corrupt { column: &'static str, value: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The content state machine forbids this move.
    #[error("Content '{id}' cannot move from {from} to {to}")]
    InvalidTransition {
        id: String,
        from: ContentStatus,
        to: ContentStatus,
    },

    /// `complete` was requested but no summary is stored.
    #[error("Content '{id}' has no summary and cannot be marked complete")]
    MissingSummary { id: String },

    /// The blocking task running a database call panicked or was cancelled.
    #[error("Database task failed: {0}")]
    Task(String),
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound { .. })
    }
}
