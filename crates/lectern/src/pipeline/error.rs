use thiserror::Error;

/// Failures that abort a pipeline run and send the job back to the queue.
///
/// Anything the record can absorb (missing bytes, unreadable PDF, AI or
/// transcript trouble) becomes a [`PipelineWarning`] and a status move
/// instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Record store failed: {0}")]
    Persistence(#[from] crate::db::DatabaseError),
}

/// Non-fatal problems recorded while a run continues.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// No usable text or transcript; the record degrades to `partial`.
    ExtractionFailed { error: String },
    /// AI title refinement failed or was rejected; the heuristic title stands.
    RefinementFailed { error: String },
    SummaryFailed { error: String },
    /// A chunk or summary write failed; the run goes on without it.
    PersistenceFailed { step: &'static str, error: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::ExtractionFailed { error } => write!(f, "extraction failed: {}", error),
            PipelineWarning::RefinementFailed { error } => {
                write!(f, "title refinement failed: {}", error)
            }
            PipelineWarning::SummaryFailed { error } => write!(f, "summary failed: {}", error),
            PipelineWarning::PersistenceFailed { step, error } => {
                write!(f, "{} write failed: {}", step, error)
            }
        }
    }
}
