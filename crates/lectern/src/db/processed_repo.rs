//! Processed-content repository. One row per content id; writes upsert.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{format_ts, parse_ts, Database, DatabaseError};
use crate::content::{Chunk, ProcessedContent};

struct ProcessedRow {
    content_id: String,
    chunks: String,
    summary: Option<String>,
    transcript: Option<String>,
    updated_at: String,
}

impl ProcessedRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            content_id: row.get("content_id")?,
            chunks: row.get("chunks")?,
            summary: row.get("summary")?,
            transcript: row.get("transcript")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_processed(self) -> Result<ProcessedContent, DatabaseError> {
        Ok(ProcessedContent {
            chunks: serde_json::from_str(&self.chunks)?,
            updated_at: parse_ts("processed_contents.updated_at", &self.updated_at)?,
            content_id: self.content_id,
            summary: self.summary,
            transcript: self.transcript,
        })
    }
}

/// Replaces the chunk list for `content_id`, creating the row if needed.
///
/// `summary` and `transcript` only overwrite when `Some`, so reprocessing
/// never erases a summary produced earlier.
pub fn upsert(
    db: &Database,
    content_id: &str,
    chunks: &[Chunk],
    summary: Option<&str>,
    transcript: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let chunks = serde_json::to_string(chunks)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO processed_contents (content_id, chunks, summary, transcript, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(content_id) DO UPDATE SET
                chunks = excluded.chunks,
                summary = COALESCE(excluded.summary, processed_contents.summary),
                transcript = COALESCE(excluded.transcript, processed_contents.transcript),
                updated_at = excluded.updated_at",
            params![content_id, chunks, summary, transcript, format_ts(now)],
        )?;
        Ok(())
    })
}

/// Stores a summary, creating an empty row if chunking has not run yet.
pub fn set_summary(
    db: &Database,
    content_id: &str,
    summary: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO processed_contents (content_id, chunks, summary, updated_at)
             VALUES (?1, '[]', ?2, ?3)
             ON CONFLICT(content_id) DO UPDATE SET
                summary = excluded.summary,
                updated_at = excluded.updated_at",
            params![content_id, summary, format_ts(now)],
        )?;
        Ok(())
    })
}

pub fn find_by_content_id(
    db: &Database,
    content_id: &str,
) -> Result<Option<ProcessedContent>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT * FROM processed_contents WHERE content_id = ?1",
                params![content_id],
                ProcessedRow::from_row,
            )
            .optional()?;
        row.map(ProcessedRow::into_processed).transpose()
    })
}
