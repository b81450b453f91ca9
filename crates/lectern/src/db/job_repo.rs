//! Job repository: the durable work queue behind the worker pool.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{content_repo, format_ts, parse_ts, Database, DatabaseError};
use crate::content::Content;
use crate::worker::job::{Job, JobKind, JobStatus};

/// A raw job row from the database.
#[derive(Debug, Clone)]
struct JobRow {
    id: String,
    content_id: String,
    kind: String,
    status: String,
    attempts: u32,
    last_error: Option<String>,
    available_at: String,
    created_at: String,
    updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            content_id: row.get("content_id")?,
            kind: row.get("kind")?,
            status: row.get("status")?,
            attempts: row.get("attempts")?,
            last_error: row.get("last_error")?,
            available_at: row.get("available_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_job(self) -> Result<Job, DatabaseError> {
        let kind = self.kind.parse().map_err(|_| DatabaseError::Corrupt {
            column: "jobs.kind",
            value: self.kind.clone(),
        })?;
        let status = self.status.parse().map_err(|_| DatabaseError::Corrupt {
            column: "jobs.status",
            value: self.status.clone(),
        })?;
        Ok(Job {
            kind,
            status,
            available_at: parse_ts("jobs.available_at", &self.available_at)?,
            created_at: parse_ts("jobs.created_at", &self.created_at)?,
            updated_at: parse_ts("jobs.updated_at", &self.updated_at)?,
            id: self.id,
            content_id: self.content_id,
            attempts: self.attempts,
            last_error: self.last_error,
        })
    }
}

fn find_in(conn: &Connection, id: &str) -> Result<Option<Job>, DatabaseError> {
    conn.query_row("SELECT * FROM jobs WHERE id = ?1", params![id], JobRow::from_row)
        .optional()?
        .map(JobRow::into_job)
        .transpose()
}

/// Queues a job unless an identical one is already pending or running.
///
/// Returns the queued (or existing) job and whether a new row was created.
pub fn enqueue(
    db: &Database,
    content_id: &str,
    kind: JobKind,
    now: DateTime<Utc>,
) -> Result<(Job, bool), DatabaseError> {
    db.with_tx(|tx| enqueue_in(tx, content_id, kind, now))
}

/// Inserts a content row and queues its first job in one transaction, so
/// neither exists without the other.
pub fn insert_content_with_job(
    db: &Database,
    content: &Content,
    kind: JobKind,
    now: DateTime<Utc>,
) -> Result<Job, DatabaseError> {
    db.with_tx(|tx| {
        content_repo::insert_in(tx, content)?;
        let (job, _) = enqueue_in(tx, &content.id, kind, now)?;
        Ok(job)
    })
}

fn enqueue_in(
    conn: &Connection,
    content_id: &str,
    kind: JobKind,
    now: DateTime<Utc>,
) -> Result<(Job, bool), DatabaseError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM jobs WHERE content_id = ?1 AND kind = ?2
             AND status IN ('pending', 'running') ORDER BY created_at LIMIT 1",
            params![content_id, kind.as_str()],
            |r| r.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        let job = find_in(conn, &id)?.ok_or_else(|| DatabaseError::NotFound {
            entity: "Job",
            id: id.clone(),
        })?;
        return Ok((job, false));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let ts = format_ts(now);
    conn.execute(
        "INSERT INTO jobs (id, content_id, kind, status, attempts, available_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4, ?4)",
        params![id, content_id, kind.as_str(), ts],
    )?;
    let job = find_in(conn, &id)?.ok_or_else(|| DatabaseError::NotFound {
        entity: "Job",
        id: id.clone(),
    })?;
    Ok((job, true))
}

/// Atomically claims the oldest available pending job whose content has no
/// other job running, marking it running and counting the attempt.
pub fn claim_next(db: &Database, now: DateTime<Utc>) -> Result<Option<Job>, DatabaseError> {
    db.with_tx(|tx| {
        let ts = format_ts(now);
        let candidate: Option<String> = tx
            .query_row(
                "SELECT id FROM jobs j
                 WHERE j.status = 'pending' AND j.available_at <= ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM jobs r
                       WHERE r.content_id = j.content_id AND r.status = 'running'
                   )
                 ORDER BY j.available_at, j.created_at, j.rowid
                 LIMIT 1",
                params![ts],
                |r| r.get(0),
            )
            .optional()?;

        let Some(id) = candidate else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE jobs SET status = 'running', attempts = attempts + 1, updated_at = ?2
             WHERE id = ?1",
            params![id, ts],
        )?;
        find_in(tx, &id)
    })
}

/// Marks a job done.
pub fn complete(db: &Database, id: &str, now: DateTime<Utc>) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE jobs SET status = 'done', last_error = NULL, updated_at = ?2 WHERE id = ?1",
            params![id, format_ts(now)],
        )?;
        Ok(())
    })
}

/// Records a failure. Below `max_attempts` the job goes back to pending
/// and becomes claimable at `retry_at`; otherwise it is dead-lettered.
pub fn fail(
    db: &Database,
    id: &str,
    error: &str,
    max_attempts: u32,
    retry_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<JobStatus, DatabaseError> {
    db.with_tx(|tx| {
        let attempts: u32 = tx
            .query_row("SELECT attempts FROM jobs WHERE id = ?1", params![id], |r| {
                r.get(0)
            })
            .optional()?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "Job",
                id: id.to_string(),
            })?;

        let next = if attempts >= max_attempts {
            JobStatus::Dead
        } else {
            JobStatus::Pending
        };

        tx.execute(
            "UPDATE jobs SET status = ?2, last_error = ?3, available_at = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                id,
                next.as_str(),
                error,
                format_ts(retry_at),
                format_ts(now)
            ],
        )?;
        Ok(next)
    })
}

/// Resets jobs left running by a crashed process. Returns how many.
pub fn recover_running(db: &Database, now: DateTime<Utc>) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let ts = format_ts(now);
        let changed = conn.execute(
            "UPDATE jobs SET status = 'pending', available_at = ?1, updated_at = ?1
             WHERE status = 'running'",
            params![ts],
        )?;
        Ok(changed)
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Job>, DatabaseError> {
    db.with_conn(|conn| find_in(conn, id))
}

/// Lists all jobs for a content record, oldest first.
pub fn list_for_content(db: &Database, content_id: &str) -> Result<Vec<Job>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM jobs WHERE content_id = ?1 ORDER BY created_at")?;
        let rows = stmt
            .query_map(params![content_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(JobRow::into_job).collect()
    })
}
