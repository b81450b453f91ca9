use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::ai::AiService;
use crate::chunk::{transcript_text, Chunker, TranscriptSegment};
use crate::content::{keys, Chunk, ContentStatus, ContentType, Metadata};
use crate::extract::{clean_candidate, extract_metadata, is_generic_title};
use crate::processor::{extract_full, is_usable_text, join_pages, ExtractError, PdfText};
use crate::sanitize::{redact_path, strip_control_chars};
use crate::storage::BlobStore;
use crate::store::ContentStore;
use crate::worker::job::{Job, JobKind};
use crate::youtube::{parse_video_id, TranscriptSource};

use super::config::PipelineConfig;
use super::context::{PipelineContext, PipelineReport};
use super::error::{PipelineError, PipelineWarning};

/// Runs `fut` under `limit`, flattening timeouts and errors into a message.
pub(crate) async fn bounded<T, E, F>(limit: Duration, fut: F) -> Result<T, String>
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {}s", limit.as_secs_f32())),
    }
}

pub struct Pipeline {
    pub(super) config: Arc<PipelineConfig>,
    pub(super) store: ContentStore,
    pub(super) blobs: Arc<dyn BlobStore>,
    pub(super) ai: Option<AiService>,
    pub(super) transcripts: Option<Arc<dyn TranscriptSource>>,
}

impl Pipeline {
    /// `ai` and `transcripts` are optional; without them titles stay
    /// heuristic, summaries are skipped and videos have no transcript.
    pub fn new(
        store: ContentStore,
        blobs: Arc<dyn BlobStore>,
        ai: Option<AiService>,
        transcripts: Option<Arc<dyn TranscriptSource>>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            blobs,
            ai,
            transcripts,
        }
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Runs one job against its content record.
    ///
    /// Only record-store failures come back as errors (and get the job
    /// retried). Everything else ends in a status the client can render.
    pub async fn run(&self, job: &Job) -> Result<PipelineReport, PipelineError> {
        let Some(content) = self.store.find(&job.content_id).await? else {
            warn!(content_id = %job.content_id, "Content no longer exists; skipping job");
            return Ok(PipelineReport::skipped());
        };

        let span = info_span!("pipeline",
            job_id = %job.id,
            content_id = %content.id,
            content_type = %content.content_type,
            kind = %job.kind,
        );
        let mut ctx = PipelineContext::new(job.clone(), content);

        async move {
            if ctx.status == ContentStatus::Error {
                debug!("Content is in error state; nothing to do");
                return Ok(ctx.into());
            }

            match (ctx.job.kind, ctx.content.content_type) {
                (JobKind::Summarize, _) => self.run_summarize(&mut ctx).await?,
                (JobKind::Process, ContentType::Pdf) => self.process_pdf(&mut ctx).await?,
                (JobKind::Process, ContentType::Youtube) => self.process_youtube(&mut ctx).await?,
                (JobKind::Process, ContentType::Text) => self.process_text(&mut ctx).await?,
                (JobKind::Process, other) => {
                    self.fail_unrecoverable(&mut ctx, format!("no processor for {} content", other))
                        .await?
                }
            }

            info!(status = %ctx.status, warnings = ctx.warnings.len(), "Pipeline finished");
            Ok(ctx.into())
        }
        .instrument(span)
        .await
    }

    async fn process_pdf(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        // Step 1: Load bytes and extract every page
        let Some(pdf) = self
            .step_extract_pdf(ctx)
            .instrument(info_span!("extract_pdf"))
            .await?
        else {
            return Ok(());
        };

        // Step 2: Sanitize
        if !self.step_prepare_text(ctx, pdf) {
            let warning = PipelineWarning::ExtractionFailed {
                error: "no usable text layer".to_string(),
            };
            return self.degrade(ctx, warning).await;
        }

        // Step 3: Quick title over the full text, persist, mark ready
        self.step_quick_title(ctx)
            .instrument(info_span!("quick_title"))
            .await?;

        // Step 4: Chunks
        let chunks = {
            let text = ctx.text.as_deref().unwrap_or_default();
            Chunker::new(self.config.chunk_chars).chunk_pages(text, &ctx.page_starts)
        };
        self.step_store_chunks(ctx, chunks, None).await;

        // Step 5: Title refinement and summary, concurrently
        self.step_enrich(ctx).instrument(info_span!("enrich")).await
    }

    async fn step_extract_pdf(
        &self,
        ctx: &mut PipelineContext,
    ) -> Result<Option<PdfText>, PipelineError> {
        let Some(key) = ctx.content.storage_path().map(str::to_string) else {
            self.fail_unrecoverable(ctx, "no stored file for pdf content".to_string())
                .await?;
            return Ok(None);
        };

        let bytes = match self.blobs.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                let error = format!("blob '{}' not found", redact_path(&key));
                self.degrade(ctx, PipelineWarning::ExtractionFailed { error })
                    .await?;
                return Ok(None);
            }
            Err(e) => {
                let error = e.to_string();
                self.degrade(ctx, PipelineWarning::ExtractionFailed { error })
                    .await?;
                return Ok(None);
            }
        };
        debug!(bytes = bytes.len(), "Loaded pdf");

        let extraction = async move {
            tokio::task::spawn_blocking(move || extract_full(&bytes))
                .await
                .map_err(|e| ExtractError::Task(e.to_string()))?
        };

        match bounded(self.config.extraction_timeout, extraction).await {
            Ok(pdf) => {
                debug!(pages = pdf.page_count, "Extracted pdf text");
                Ok(Some(pdf))
            }
            Err(error) => {
                self.degrade(ctx, PipelineWarning::ExtractionFailed { error })
                    .await?;
                Ok(None)
            }
        }
    }

    /// Strips characters the record store cannot hold and joins the pages.
    /// Returns false if nothing usable is left.
    fn step_prepare_text(&self, ctx: &mut PipelineContext, pdf: PdfText) -> bool {
        let pages: Vec<String> = pdf.pages.iter().map(|p| strip_control_chars(p)).collect();
        let (text, page_starts) = join_pages(&pages);

        if !is_usable_text(&text) {
            debug!(chars = text.chars().count(), "Extracted text is not usable");
            return false;
        }

        ctx.first_page = pages.into_iter().next();
        ctx.text = Some(text);
        ctx.page_starts = page_starts;
        true
    }

    async fn step_quick_title(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let text = ctx.text.clone().unwrap_or_default();
        let extracted = extract_metadata(&text);
        let patch = extracted.to_metadata_patch("pdf_full_text");

        let title = extracted
            .best_title()
            .map(str::to_string)
            .or_else(|| info_title_candidate(&ctx.content.metadata));

        let id = ctx.content_id().to_string();
        self.store.set_extracted_text(&id, &text).await?;
        self.store.merge_metadata(&id, patch).await?;
        if let Some(title) = &title {
            let changed = self.store.update_title(&id, title).await?;
            debug!(title = %title, changed, "Quick title");
        }

        self.advance(ctx, ContentStatus::Ready).await
    }

    /// Chunk writes are non-fatal: the record is still readable without them.
    async fn step_store_chunks(
        &self,
        ctx: &mut PipelineContext,
        chunks: Vec<Chunk>,
        transcript: Option<String>,
    ) {
        let count = chunks.len();
        match self
            .store
            .upsert_processed(ctx.content_id(), chunks, transcript)
            .await
        {
            Ok(()) => debug!(chunks = count, "Stored chunks"),
            Err(e) => {
                let warning = PipelineWarning::PersistenceFailed {
                    step: "chunks",
                    error: e.to_string(),
                };
                warn!(%warning);
                ctx.warnings.push(warning);
            }
        }
    }

    async fn step_enrich(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let first_page = ctx.first_page.clone();
        let text = ctx.text.clone();

        let refine = async {
            match (&self.ai, first_page.as_deref()) {
                (Some(ai), Some(page)) if !page.trim().is_empty() => {
                    Some(bounded(self.config.ai_timeout, ai.refine_title(page)).await)
                }
                _ => None,
            }
        };
        let summary = self.generate_summary(text.as_deref());

        let (refined, summary) = tokio::join!(refine, summary);

        if let Some(refined) = refined {
            self.apply_refined_title(ctx, refined).await;
        }
        self.apply_summary(ctx, summary).await
    }

    async fn process_youtube(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let video_id = ctx
            .content
            .metadata_str(keys::VIDEO_ID)
            .map(str::to_string)
            .or_else(|| ctx.content.raw_url.as_deref().and_then(parse_video_id));
        let Some(video_id) = video_id else {
            return self
                .fail_unrecoverable(ctx, "no video id for youtube content".to_string())
                .await;
        };

        let segments = self
            .step_fetch_transcript(ctx, &video_id)
            .instrument(info_span!("fetch_transcript", video_id = %video_id))
            .await;

        let Some(segments) = segments else {
            // No transcript is an expected outcome, not a failure.
            debug!("No transcript; video stays partial");
            return self.advance(ctx, ContentStatus::Partial).await;
        };

        let text = transcript_text(&segments);
        let chunks = Chunker::new(self.config.chunk_chars).chunk_transcript(&segments);
        self.store.set_extracted_text(ctx.content_id(), &text).await?;
        self.step_store_chunks(ctx, chunks, Some(text.clone())).await;
        self.advance(ctx, ContentStatus::Ready).await?;

        let summary = self.generate_summary(Some(&text)).await;
        self.apply_summary(ctx, summary).await
    }

    async fn step_fetch_transcript(
        &self,
        ctx: &mut PipelineContext,
        video_id: &str,
    ) -> Option<Vec<TranscriptSegment>> {
        let Some(source) = &self.transcripts else {
            debug!("No transcript source configured");
            return None;
        };

        match bounded(self.config.transcript_timeout, source.fetch(video_id)).await {
            Ok(Some(segments)) => {
                let segments: Vec<TranscriptSegment> = segments
                    .into_iter()
                    .map(|s| TranscriptSegment {
                        text: strip_control_chars(&s.text),
                        ..s
                    })
                    .filter(|s| !s.text.trim().is_empty())
                    .collect();
                (!segments.is_empty()).then_some(segments)
            }
            Ok(None) => None,
            Err(error) => {
                let warning = PipelineWarning::ExtractionFailed { error };
                warn!(%warning, "Transcript fetch failed");
                ctx.warnings.push(warning);
                None
            }
        }
    }

    async fn process_text(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let raw = ctx.content.extracted_text.clone().unwrap_or_default();
        let text = strip_control_chars(&raw);
        if text.trim().is_empty() {
            let warning = PipelineWarning::ExtractionFailed {
                error: "text note has no body".to_string(),
            };
            return self.degrade(ctx, warning).await;
        }
        if text != raw {
            self.store.set_extracted_text(ctx.content_id(), &text).await?;
        }

        let chunks = Chunker::new(self.config.chunk_chars).chunk_text(&text);
        self.step_store_chunks(ctx, chunks, None).await;
        self.advance(ctx, ContentStatus::Ready).await?;

        let summary = self.generate_summary(Some(&text)).await;
        self.apply_summary(ctx, summary).await
    }

    /// Summary-only run for records stuck at ready/partial without one.
    async fn run_summarize(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        if !ctx.status.awaits_summary() {
            debug!(status = %ctx.status, "Status does not await a summary");
            return Ok(());
        }

        let processed = self.store.processed(ctx.content_id()).await?;
        if processed.as_ref().is_some_and(|p| p.has_summary()) {
            return self.advance(ctx, ContentStatus::Complete).await;
        }

        let text = ctx
            .content
            .extracted_text
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| processed.and_then(|p| p.transcript));
        let Some(text) = text else {
            let warning = PipelineWarning::SummaryFailed {
                error: "no text to summarize".to_string(),
            };
            warn!(%warning);
            ctx.warnings.push(warning);
            return Ok(());
        };

        let summary = self.generate_summary(Some(&text)).await;
        self.apply_summary(ctx, summary).await
    }

    /// `None` when there is nothing to do (AI disabled or no text).
    async fn generate_summary(&self, text: Option<&str>) -> Option<Result<String, String>> {
        let ai = self.ai.as_ref()?;
        let text = text.filter(|t| !t.trim().is_empty())?;
        Some(
            bounded(self.config.ai_timeout, ai.summarize(text))
                .instrument(info_span!("summarize"))
                .await,
        )
    }

    async fn apply_refined_title(&self, ctx: &mut PipelineContext, refined: Result<String, String>) {
        let title = match refined {
            Ok(title) => title,
            Err(error) => {
                debug!(error = %error, "Title refinement discarded");
                ctx.warnings
                    .push(PipelineWarning::RefinementFailed { error });
                return;
            }
        };

        let id = ctx.content_id().to_string();
        let mut patch = Metadata::new();
        patch.insert(keys::DISPLAY_TITLE.into(), json!(title));
        patch.insert("title_source".into(), json!("ai"));

        let result = async {
            let changed = self.store.update_title(&id, &title).await?;
            self.store.merge_metadata(&id, patch).await?;
            Ok::<bool, crate::db::DatabaseError>(changed)
        }
        .await;

        match result {
            Ok(changed) => debug!(title = %title, changed, "Applied refined title"),
            Err(e) => {
                // Refinement is best effort; the quick title stands.
                ctx.warnings.push(PipelineWarning::RefinementFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    async fn apply_summary(
        &self,
        ctx: &mut PipelineContext,
        summary: Option<Result<String, String>>,
    ) -> Result<(), PipelineError> {
        let summary = match summary {
            None => {
                debug!("Summary skipped");
                return Ok(());
            }
            Some(Ok(summary)) => summary,
            Some(Err(error)) => {
                let warning = PipelineWarning::SummaryFailed { error };
                warn!(%warning);
                ctx.warnings.push(warning);
                return Ok(());
            }
        };

        if let Err(e) = self.store.set_summary(ctx.content_id(), &summary).await {
            let warning = PipelineWarning::PersistenceFailed {
                step: "summary",
                error: e.to_string(),
            };
            warn!(%warning);
            ctx.warnings.push(warning);
            return Ok(());
        }

        self.advance(ctx, ContentStatus::Complete).await
    }

    /// Moves the record forward. `complete` is never downgraded by a later
    /// run, and moves the state machine forbids are skipped.
    pub(super) async fn advance(
        &self,
        ctx: &mut PipelineContext,
        next: ContentStatus,
    ) -> Result<(), PipelineError> {
        if ctx.status == ContentStatus::Complete && next != ContentStatus::Error {
            return Ok(());
        }
        if !ctx.status.can_transition_to(next) {
            debug!(from = %ctx.status, to = %next, "Skipping status change");
            return Ok(());
        }
        if ctx.status != next {
            self.store.set_status(ctx.content_id(), next).await?;
            ctx.status = next;
        }
        Ok(())
    }

    async fn degrade(
        &self,
        ctx: &mut PipelineContext,
        warning: PipelineWarning,
    ) -> Result<(), PipelineError> {
        warn!(%warning, "Degrading content");
        ctx.warnings.push(warning);
        self.advance(ctx, ContentStatus::Partial).await
    }

    async fn fail_unrecoverable(
        &self,
        ctx: &mut PipelineContext,
        reason: String,
    ) -> Result<(), PipelineError> {
        warn!(reason = %reason, "Unrecoverable content");
        let mut patch = Metadata::new();
        patch.insert(keys::PROCESSING_ERROR.into(), json!(reason));
        self.store.merge_metadata(ctx.content_id(), patch).await?;
        self.advance(ctx, ContentStatus::Error).await
    }
}

/// The document information title, if it survives the title filters.
pub(super) fn info_title_candidate(metadata: &Metadata) -> Option<String> {
    metadata
        .get(keys::INFO)
        .and_then(|info| info.get(keys::INFO_TITLE))
        .and_then(|t| t.as_str())
        .and_then(clean_candidate)
        .filter(|t| !is_generic_title(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::service::tests::ScriptedModel;
    use crate::ai::AiError;
    use crate::content::{Content, NewContent};
    use crate::db::Database;
    use crate::processor::pdf::tests::build_pdf;
    use crate::storage::FsBlobStore;
    use crate::youtube::YoutubeError;
    use async_trait::async_trait;
    use chrono::Utc;
    use tempfile::TempDir;

    const PAGE_ONE: &str = "Reprint 2024-25\nMATHEMATICS\nTextbook for Class VIII\n\
        1 A SQUARE AND A CUBE\nQueen Rukhsana had a pair of dice and a board of squares.\n\
        1.1 Introduction\nNumbers that are squares of other numbers.";
    const PAGE_TWO: &str = "Perfect cubes appear when a number is multiplied by itself \
        three times. 1 8 27 64 are the first perfect cubes.";

    struct Harness {
        _dir: TempDir,
        store: ContentStore,
        blobs: Arc<FsBlobStore>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let blobs = Arc::new(FsBlobStore::new(dir.path()));
            Self {
                store: ContentStore::new(Database::open_in_memory().unwrap()),
                blobs,
                _dir: dir,
            }
        }

        fn pipeline(
            &self,
            ai: Option<AiService>,
            transcripts: Option<Arc<dyn TranscriptSource>>,
        ) -> Pipeline {
            Pipeline::new(
                self.store.clone(),
                self.blobs.clone(),
                ai,
                transcripts,
                PipelineConfig::default(),
            )
        }

        async fn create(
            &self,
            content_type: ContentType,
            status: ContentStatus,
            metadata: Metadata,
            text: Option<&str>,
        ) -> Content {
            self.store
                .create(NewContent {
                    workspace_id: "ws".into(),
                    content_type,
                    status,
                    title: "PDF Document".into(),
                    raw_url: None,
                    metadata,
                    file_size: None,
                    extracted_text: text.map(str::to_string),
                })
                .await
                .unwrap()
        }
    }

    fn job(content_id: &str, kind: JobKind) -> Job {
        let now = Utc::now();
        Job {
            id: uuid::Uuid::new_v4().to_string(),
            content_id: content_id.to_string(),
            kind,
            status: crate::worker::job::JobStatus::Running,
            attempts: 1,
            last_error: None,
            available_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn ai(replies: Vec<Result<String, AiError>>) -> AiService {
        AiService::new(Arc::new(ScriptedModel::new(replies)), "fast", "big", 12_000)
    }

    fn storage_meta(key: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(keys::STORAGE_PATH.into(), json!(key));
        metadata
    }

    #[tokio::test]
    async fn test_pdf_runs_to_complete() {
        let h = Harness::new();
        h.blobs
            .put("ws/a.pdf", &build_pdf(&[PAGE_ONE, PAGE_TWO], None))
            .await
            .unwrap();
        let content = h
            .create(ContentType::Pdf, ContentStatus::Processing, storage_meta("ws/a.pdf"), None)
            .await;

        let pipeline = h.pipeline(
            Some(ai(vec![
                Ok(r#"{"title": "Squares and Cubes"}"#.into()),
                Ok("Squares and cubes of whole numbers.".into()),
            ])),
            None,
        );
        let report = pipeline.run(&job(&content.id, JobKind::Process)).await.unwrap();
        assert_eq!(report.status, Some(ContentStatus::Complete));
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let stored = h.store.get(&content.id).await.unwrap();
        assert_eq!(stored.status, ContentStatus::Complete);
        assert_eq!(stored.title, "Squares and Cubes");
        assert_eq!(stored.metadata["chapter_number"], 1);
        assert_eq!(stored.metadata["grade"], 8);
        assert_eq!(stored.metadata["title_source"], "ai");
        assert!(stored.extracted_text.unwrap().contains("Perfect cubes"));

        let processed = h.store.processed(&content.id).await.unwrap().unwrap();
        assert_eq!(
            processed.summary.as_deref(),
            Some("Squares and cubes of whole numbers.")
        );
        assert_eq!(processed.chunks[0].page, Some(1));
    }

    #[tokio::test]
    async fn test_rejected_refinement_keeps_quick_title() {
        let h = Harness::new();
        h.blobs
            .put("ws/a.pdf", &build_pdf(&[PAGE_ONE], None))
            .await
            .unwrap();
        let content = h
            .create(ContentType::Pdf, ContentStatus::Processing, storage_meta("ws/a.pdf"), None)
            .await;

        let pipeline = h.pipeline(
            Some(ai(vec![
                Ok("MATHEMATICS".into()),
                Err(AiError::Network("down".into())),
            ])),
            None,
        );
        let report = pipeline.run(&job(&content.id, JobKind::Process)).await.unwrap();

        assert_eq!(report.status, Some(ContentStatus::Ready));
        assert_eq!(report.warnings.len(), 2);
        let stored = h.store.get(&content.id).await.unwrap();
        assert_eq!(stored.title, "A SQUARE AND A CUBE");
        assert_eq!(stored.status, ContentStatus::Ready);
    }

    #[tokio::test]
    async fn test_reprocessing_is_idempotent() {
        let h = Harness::new();
        h.blobs
            .put("ws/a.pdf", &build_pdf(&[PAGE_ONE, PAGE_TWO], None))
            .await
            .unwrap();
        let content = h
            .create(ContentType::Pdf, ContentStatus::Processing, storage_meta("ws/a.pdf"), None)
            .await;
        let pipeline = h.pipeline(None, None);

        pipeline.run(&job(&content.id, JobKind::Process)).await.unwrap();
        let first = h.store.processed(&content.id).await.unwrap().unwrap();
        let first_title = h.store.get(&content.id).await.unwrap().title;

        pipeline.run(&job(&content.id, JobKind::Process)).await.unwrap();
        let second = h.store.processed(&content.id).await.unwrap().unwrap();
        let stored = h.store.get(&content.id).await.unwrap();

        assert_eq!(first.chunks, second.chunks);
        assert_eq!(stored.title, first_title);
        assert_eq!(stored.status, ContentStatus::Ready);
    }

    #[tokio::test]
    async fn test_missing_blob_degrades_to_partial() {
        let h = Harness::new();
        let content = h
            .create(ContentType::Pdf, ContentStatus::Ready, storage_meta("ws/gone.pdf"), None)
            .await;

        let report = h
            .pipeline(None, None)
            .run(&job(&content.id, JobKind::Process))
            .await
            .unwrap();
        assert_eq!(report.status, Some(ContentStatus::Partial));
        assert!(matches!(
            report.warnings[0],
            PipelineWarning::ExtractionFailed { .. }
        ));
        // Only the file name reaches the logged warning.
        let logged = report.warnings[0].to_string();
        assert!(logged.contains("'gone.pdf'"), "{logged}");
        assert!(!logged.contains("ws/"), "{logged}");
    }

    #[tokio::test]
    async fn test_corrupted_pdf_degrades_to_partial() {
        let h = Harness::new();
        h.blobs.put("ws/bad.pdf", b"%PDF-1.4 garbage").await.unwrap();
        let content = h
            .create(ContentType::Pdf, ContentStatus::Processing, storage_meta("ws/bad.pdf"), None)
            .await;

        let report = h
            .pipeline(None, None)
            .run(&job(&content.id, JobKind::Process))
            .await
            .unwrap();
        assert_eq!(report.status, Some(ContentStatus::Partial));
    }

    #[tokio::test]
    async fn test_pdf_without_stored_file_is_error() {
        let h = Harness::new();
        let content = h
            .create(ContentType::Pdf, ContentStatus::Processing, Metadata::new(), None)
            .await;

        let report = h
            .pipeline(None, None)
            .run(&job(&content.id, JobKind::Process))
            .await
            .unwrap();
        assert_eq!(report.status, Some(ContentStatus::Error));
        let stored = h.store.get(&content.id).await.unwrap();
        assert!(stored.metadata.contains_key("processing_error"));
    }

    #[tokio::test]
    async fn test_text_summary_failure_stays_ready() {
        let h = Harness::new();
        let content = h
            .create(
                ContentType::Text,
                ContentStatus::Ready,
                Metadata::new(),
                Some("Photosynthesis\u{0} converts light into chemical energy."),
            )
            .await;

        let pipeline = h.pipeline(Some(ai(vec![Err(AiError::Empty)])), None);
        let report = pipeline.run(&job(&content.id, JobKind::Process)).await.unwrap();
        assert_eq!(report.status, Some(ContentStatus::Ready));

        let stored = h.store.get(&content.id).await.unwrap();
        assert_eq!(
            stored.extracted_text.as_deref(),
            Some("Photosynthesis converts light into chemical energy.")
        );
        let processed = h.store.processed(&content.id).await.unwrap().unwrap();
        assert!(processed.summary.is_none());
        assert_eq!(processed.chunks.len(), 1);
    }

    struct FixedTranscript(Result<Option<Vec<TranscriptSegment>>, YoutubeError>);

    #[async_trait]
    impl TranscriptSource for FixedTranscript {
        async fn fetch(
            &self,
            _video_id: &str,
        ) -> Result<Option<Vec<TranscriptSegment>>, YoutubeError> {
            match &self.0 {
                Ok(segments) => Ok(segments.clone()),
                Err(_) => Err(YoutubeError::Network("unreachable".into())),
            }
        }
    }

    fn video_meta() -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert(keys::VIDEO_ID.into(), json!("dQw4w9WgXcQ"));
        metadata
    }

    #[tokio::test]
    async fn test_youtube_with_transcript_completes() {
        let h = Harness::new();
        let content = h
            .create(ContentType::Youtube, ContentStatus::Ready, video_meta(), None)
            .await;
        let segments = vec![
            TranscriptSegment {
                start: 0.0,
                duration: 2.0,
                text: "Welcome to the lecture.".into(),
            },
            TranscriptSegment {
                start: 2.0,
                duration: 3.0,
                text: "Today we cover entropy.".into(),
            },
        ];
        let pipeline = h.pipeline(
            Some(ai(vec![Ok("A lecture on entropy.".into())])),
            Some(Arc::new(FixedTranscript(Ok(Some(segments))))),
        );

        let report = pipeline.run(&job(&content.id, JobKind::Process)).await.unwrap();
        assert_eq!(report.status, Some(ContentStatus::Complete));

        let processed = h.store.processed(&content.id).await.unwrap().unwrap();
        assert_eq!(
            processed.transcript.as_deref(),
            Some("Welcome to the lecture.\nToday we cover entropy.")
        );
        assert_eq!(processed.chunks[0].timestamp, Some(0.0));
    }

    #[tokio::test]
    async fn test_youtube_without_transcript_is_partial() {
        let h = Harness::new();
        for source in [
            FixedTranscript(Ok(None)),
            FixedTranscript(Err(YoutubeError::Network("x".into()))),
        ] {
            let content = h
                .create(ContentType::Youtube, ContentStatus::Ready, video_meta(), None)
                .await;
            let pipeline = h.pipeline(None, Some(Arc::new(source)));
            let report = pipeline.run(&job(&content.id, JobKind::Process)).await.unwrap();
            assert_eq!(report.status, Some(ContentStatus::Partial));
        }
    }

    #[tokio::test]
    async fn test_complete_is_not_downgraded() {
        let h = Harness::new();
        let content = h
            .create(ContentType::Text, ContentStatus::Ready, Metadata::new(), Some("Body"))
            .await;
        h.store.set_summary(&content.id, "Done.").await.unwrap();
        h.store
            .set_status(&content.id, ContentStatus::Complete)
            .await
            .unwrap();

        let report = h
            .pipeline(None, None)
            .run(&job(&content.id, JobKind::Process))
            .await
            .unwrap();
        assert_eq!(report.status, Some(ContentStatus::Complete));
    }

    #[tokio::test]
    async fn test_summarize_job_completes_partial_record() {
        let h = Harness::new();
        let content = h
            .create(ContentType::Text, ContentStatus::Ready, Metadata::new(), Some("Body text"))
            .await;
        h.store
            .set_status(&content.id, ContentStatus::Partial)
            .await
            .unwrap();

        let pipeline = h.pipeline(Some(ai(vec![Ok("Short summary.".into())])), None);
        let report = pipeline.run(&job(&content.id, JobKind::Summarize)).await.unwrap();
        assert_eq!(report.status, Some(ContentStatus::Complete));
    }

    #[tokio::test]
    async fn test_missing_content_is_skipped() {
        let h = Harness::new();
        let report = h
            .pipeline(None, None)
            .run(&job("nope", JobKind::Process))
            .await
            .unwrap();
        assert_eq!(report, PipelineReport::skipped());
    }

    #[test]
    fn test_info_title_candidate_filters_generic() {
        let mut metadata = Metadata::new();
        metadata.insert(keys::INFO.into(), json!({"Title": "Untitled"}));
        assert_eq!(info_title_candidate(&metadata), None);
        metadata.insert(keys::INFO.into(), json!({"Title": "Organic Chemistry Notes"}));
        assert_eq!(
            info_title_candidate(&metadata).as_deref(),
            Some("Organic Chemistry Notes")
        );
    }
}
