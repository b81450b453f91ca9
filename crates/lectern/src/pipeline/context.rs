use crate::content::{Content, ContentStatus};
use crate::worker::job::Job;

use super::error::PipelineWarning;

/// Per-run state threaded through the pipeline steps.
pub struct PipelineContext {
    pub job: Job,
    pub content: Content,

    /// Last status written by this run (starts as the stored status).
    pub status: ContentStatus,

    /// Sanitized full text once extraction has succeeded.
    pub text: Option<String>,

    /// Byte offsets of page starts within `text`, for PDFs.
    pub page_starts: Vec<usize>,

    /// First page only, for title refinement.
    pub first_page: Option<String>,

    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job: Job, content: Content) -> Self {
        let status = content.status;
        Self {
            job,
            content,
            status,
            text: None,
            page_starts: Vec::new(),
            first_page: None,
            warnings: Vec::new(),
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content.id
    }
}

/// What a finished run left behind. `status` is `None` when the record
/// was deleted before the job ran.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub status: Option<ContentStatus>,
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineReport {
    pub fn skipped() -> Self {
        Self {
            status: None,
            warnings: Vec::new(),
        }
    }
}

impl From<PipelineContext> for PipelineReport {
    fn from(ctx: PipelineContext) -> Self {
        Self {
            status: Some(ctx.status),
            warnings: ctx.warnings,
        }
    }
}
