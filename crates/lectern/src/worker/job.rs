use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a queued job does for its content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Full background pipeline: extraction, chunking, refinement, summary.
    Process,
    /// Summary only, for records stuck at ready/partial without one.
    Summarize,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Process => "process",
            JobKind::Summarize => "summarize",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "process" => Ok(JobKind::Process),
            "summarize" => Ok(JobKind::Summarize),
            other => Err(format!("unknown job kind '{}'", other)),
        }
    }
}

/// Queue state of a job. `Dead` is the dead-letter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Dead,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "done" => Ok(JobStatus::Done),
            "dead" => Ok(JobStatus::Dead),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// A persisted queue entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub content_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Number of times the job has been claimed.
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Earliest time a worker may claim the job.
    pub available_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What happened to a job after a worker ran it.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Done,
    /// Failed; queued again for another attempt.
    Retrying { attempts: u32, error: String },
    /// Failed for the last time; moved to the dead-letter state.
    Dead { error: String },
}

/// Delay before retry `attempts + 1`: 2s, 4s, 8s ... capped at 60s.
pub fn retry_backoff(attempts: u32) -> std::time::Duration {
    let secs = 2u64.saturating_pow(attempts.clamp(1, 6));
    std::time::Duration::from_secs(secs.min(60))
}
