//! Content repository: CRUD and invariant-checked updates for `contents`.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{format_ts, parse_ts, Database, DatabaseError};
use crate::content::{merge_metadata as merge_bag, Content, ContentStatus, ContentType, Metadata};
use crate::extract::is_generic_title;

/// A raw content row from the database.
#[derive(Debug, Clone)]
struct ContentRow {
    id: String,
    workspace_id: String,
    content_type: String,
    status: String,
    title: String,
    raw_url: Option<String>,
    extracted_text: Option<String>,
    metadata: String,
    file_size: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl ContentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            workspace_id: row.get("workspace_id")?,
            content_type: row.get("content_type")?,
            status: row.get("status")?,
            title: row.get("title")?,
            raw_url: row.get("raw_url")?,
            extracted_text: row.get("extracted_text")?,
            metadata: row.get("metadata")?,
            file_size: row.get("file_size")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_content(self) -> Result<Content, DatabaseError> {
        let content_type: ContentType =
            self.content_type
                .parse()
                .map_err(|_| DatabaseError::Corrupt {
                    column: "contents.content_type",
                    value: self.content_type.clone(),
                })?;
        let status = parse_status(&self.status)?;
        Ok(Content {
            content_type,
            status,
            metadata: serde_json::from_str(&self.metadata)?,
            file_size: self.file_size.and_then(|n| u64::try_from(n).ok()),
            created_at: parse_ts("contents.created_at", &self.created_at)?,
            updated_at: parse_ts("contents.updated_at", &self.updated_at)?,
            id: self.id,
            workspace_id: self.workspace_id,
            title: self.title,
            raw_url: self.raw_url,
            extracted_text: self.extracted_text,
        })
    }
}

fn parse_status(value: &str) -> Result<ContentStatus, DatabaseError> {
    value.parse().map_err(|_| DatabaseError::Corrupt {
        column: "contents.status",
        value: value.to_string(),
    })
}

fn not_found(id: &str) -> DatabaseError {
    DatabaseError::NotFound {
        entity: "Content",
        id: id.to_string(),
    }
}

fn find_in(conn: &Connection, id: &str) -> Result<Option<Content>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM contents WHERE id = ?1",
            params![id],
            ContentRow::from_row,
        )
        .optional()?;
    row.map(ContentRow::into_content).transpose()
}

fn touch(conn: &Connection, id: &str, now: DateTime<Utc>) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE contents SET updated_at = ?2 WHERE id = ?1",
        params![id, format_ts(now)],
    )?;
    Ok(())
}

/// Inserts a new content row.
#[cfg(test)]
pub(crate) fn insert(db: &Database, content: &Content) -> Result<(), DatabaseError> {
    db.with_conn(|conn| insert_in(conn, content))
}

/// Inserts on a caller-held connection, so the row can share a transaction.
pub(crate) fn insert_in(conn: &Connection, content: &Content) -> Result<(), DatabaseError> {
    let metadata = serde_json::to_string(&content.metadata)?;
    conn.execute(
        "INSERT INTO contents (id, workspace_id, content_type, status, title, raw_url,
         extracted_text, metadata, file_size, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            content.id,
            content.workspace_id,
            content.content_type.as_str(),
            content.status.as_str(),
            content.title,
            content.raw_url,
            content.extracted_text,
            metadata,
            content.file_size.and_then(|n| i64::try_from(n).ok()),
            format_ts(content.created_at),
            format_ts(content.updated_at),
        ],
    )?;
    Ok(())
}

/// Finds a content record by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Content>, DatabaseError> {
    db.with_conn(|conn| find_in(conn, id))
}

/// Like [`find_by_id`], but a missing row is an error.
pub fn get(db: &Database, id: &str) -> Result<Content, DatabaseError> {
    find_by_id(db, id)?.ok_or_else(|| not_found(id))
}

/// Replaces the title unless that would regress a specific title to a
/// generic placeholder. Returns whether the title changed.
pub fn update_title(
    db: &Database,
    id: &str,
    title: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let current: String = conn
            .query_row(
                "SELECT title FROM contents WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found(id))?;

        let title = title.trim();
        if title == current || (is_generic_title(title) && !is_generic_title(&current)) {
            return Ok(false);
        }

        conn.execute(
            "UPDATE contents SET title = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, title, format_ts(now)],
        )?;
        Ok(true)
    })
}

/// Read-modify-write merge of `patch` into the metadata bag, atomic under
/// the connection lock. Returns the merged bag.
pub fn merge_metadata(
    db: &Database,
    id: &str,
    patch: Metadata,
    now: DateTime<Utc>,
) -> Result<Metadata, DatabaseError> {
    db.with_conn(|conn| {
        let raw: String = conn
            .query_row(
                "SELECT metadata FROM contents WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found(id))?;

        let mut bag: Metadata = serde_json::from_str(&raw)?;
        merge_bag(&mut bag, patch);

        conn.execute(
            "UPDATE contents SET metadata = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, serde_json::to_string(&bag)?, format_ts(now)],
        )?;
        Ok(bag)
    })
}

/// Sets a top-level metadata key only if it is absent, atomic under the
/// connection lock. Returns `None` when this call set it, otherwise the
/// value already there.
pub fn insert_metadata_if_absent(
    db: &Database,
    id: &str,
    key: &str,
    value: serde_json::Value,
    now: DateTime<Utc>,
) -> Result<Option<serde_json::Value>, DatabaseError> {
    db.with_conn(|conn| {
        let raw: String = conn
            .query_row(
                "SELECT metadata FROM contents WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found(id))?;

        let mut bag: Metadata = serde_json::from_str(&raw)?;
        if let Some(existing) = bag.get(key) {
            return Ok(Some(existing.clone()));
        }
        bag.insert(key.to_string(), value);

        conn.execute(
            "UPDATE contents SET metadata = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, serde_json::to_string(&bag)?, format_ts(now)],
        )?;
        Ok(None)
    })
}

/// Moves the record to `next`, enforcing the state machine. `complete` also
/// requires a non-empty summary in `processed_contents`. Returns the
/// previous status.
pub fn set_status(
    db: &Database,
    id: &str,
    next: ContentStatus,
    now: DateTime<Utc>,
) -> Result<ContentStatus, DatabaseError> {
    db.with_conn(|conn| {
        let raw: String = conn
            .query_row(
                "SELECT status FROM contents WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| not_found(id))?;
        let current = parse_status(&raw)?;

        if !current.can_transition_to(next) {
            return Err(DatabaseError::InvalidTransition {
                id: id.to_string(),
                from: current,
                to: next,
            });
        }

        if next == ContentStatus::Complete {
            let has_summary: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM processed_contents
                 WHERE content_id = ?1 AND summary IS NOT NULL AND TRIM(summary) != '')",
                params![id],
                |r| r.get(0),
            )?;
            if !has_summary {
                return Err(DatabaseError::MissingSummary { id: id.to_string() });
            }
        }

        if current != next {
            conn.execute(
                "UPDATE contents SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, next.as_str(), format_ts(now)],
            )?;
        }
        Ok(current)
    })
}

/// Stores the full extracted text.
pub fn set_extracted_text(
    db: &Database,
    id: &str,
    text: &str,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE contents SET extracted_text = ?2 WHERE id = ?1",
            params![id, text],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        touch(conn, id, now)
    })
}
