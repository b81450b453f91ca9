//! Ingestion gateway: the only place content records are created.
//!
//! Each request gets a usable title before the record exists (first-page
//! heuristics for PDFs, a metadata lookup for videos, the first heading for
//! text), then the record and its `process` job are written in one
//! transaction and the id returned without waiting for the job.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::content::{keys, ContentStatus, ContentType, Metadata, NewContent};
use crate::error::{IngestError, StorageError, WorkerError};
use crate::extract::denylist::{FALLBACK_PDF_TITLE, FALLBACK_TEXT_TITLE};
use crate::extract::{clean_candidate, extract_metadata, is_generic_title};
use crate::pipeline::bounded;
use crate::processor::{extract_first_page, ExtractError, PdfText};
use crate::sanitize::{redact_path, strip_control_chars, truncate_chars};
use crate::storage::{new_blob_key, BlobStore};
use crate::worker::{JobKind, JobQueue};
use crate::youtube::{parse_video_id, VideoMetadata, YoutubeClient};

const MAX_USER_TITLE_CHARS: usize = 200;

/// Raw ingestion request as it arrives from the HTTP form.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// `pdf`, `youtube` or `text`.
    pub content_type: String,
    pub workspace_id: String,
    pub file: Option<Vec<u8>>,
    pub filename: Option<String>,
    /// Key of a blob uploaded earlier, used instead of `file`.
    pub storage_path: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReceipt {
    pub content_id: String,
    pub status: ContentStatus,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub fast_path_chars: usize,
    pub fast_path_timeout: Duration,
    pub metadata_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl GatewayConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            fast_path_chars: config.extraction.fast_path_chars,
            fast_path_timeout: config.timeouts.fast_path(),
            metadata_timeout: config.timeouts.metadata(),
            max_upload_bytes: config.extraction.max_upload_bytes,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Clone)]
pub struct Gateway {
    blobs: Arc<dyn BlobStore>,
    youtube: Arc<YoutubeClient>,
    queue: JobQueue,
    config: Arc<GatewayConfig>,
}

impl Gateway {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        youtube: Arc<YoutubeClient>,
        queue: JobQueue,
        config: GatewayConfig,
    ) -> Self {
        Self {
            blobs,
            youtube,
            queue,
            config: Arc::new(config),
        }
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReceipt, IngestError> {
        let workspace_id = request.workspace_id.trim().to_string();
        if workspace_id.is_empty() {
            return Err(IngestError::InvalidInput("workspaceId is required".into()));
        }
        let content_type: ContentType = request
            .content_type
            .parse()
            .map_err(IngestError::InvalidInput)?;

        let uploaded = request.file.as_ref().is_some_and(|b| !b.is_empty());

        let span = info_span!("ingest", content_type = %content_type, workspace_id = %workspace_id);
        async move {
            let new = match content_type {
                ContentType::Pdf => self.prepare_pdf(&workspace_id, request).await?,
                ContentType::Youtube => self.prepare_youtube(&workspace_id, request).await?,
                ContentType::Text => prepare_text(&workspace_id, request, &self.config)?,
                ContentType::Audio | ContentType::Video => {
                    return Err(IngestError::InvalidInput(format!(
                        "{} ingestion is not supported",
                        content_type
                    )));
                }
            };

            let staged = match (content_type, uploaded) {
                (ContentType::Pdf, true) => new
                    .metadata
                    .get(keys::STORAGE_PATH)
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                _ => None,
            };

            let content = new.into_content(Utc::now());
            let job = match self.queue.submit_with_content(&content, JobKind::Process).await {
                Ok(job) => job,
                Err(e) => {
                    if let Some(key) = staged {
                        self.discard_upload(&key).await;
                    }
                    return Err(match e {
                        WorkerError::Database(db) => IngestError::Persistence(db),
                        other => IngestError::Scheduling(other),
                    });
                }
            };

            info!(
                content_id = %content.id,
                job_id = %job.id,
                status = %content.status,
                "Content ingested"
            );
            Ok(IngestReceipt {
                content_id: content.id,
                status: content.status,
                title: content.title,
            })
        }
        .instrument(span)
        .await
    }

    /// Removes a blob staged by this request once its record could not be
    /// written.
    async fn discard_upload(&self, key: &str) {
        match self.blobs.delete(key).await {
            Ok(_) => debug!(file = %redact_path(key), "Discarded staged upload"),
            Err(e) => warn!(file = %redact_path(key), error = %e, "Failed to discard staged upload"),
        }
    }

    async fn prepare_pdf(
        &self,
        workspace_id: &str,
        request: IngestRequest,
    ) -> Result<NewContent, IngestError> {
        let (key, bytes) = self.stage_pdf(workspace_id, &request).await?;
        let file_size = bytes.len() as u64;

        let pdf = self
            .fast_path(bytes)
            .instrument(info_span!("fast_path"))
            .await;

        let filename = request
            .filename
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());

        let mut metadata = Metadata::new();
        metadata.insert(keys::STORAGE_PATH.into(), json!(key));
        if let Some(filename) = filename {
            metadata.insert(keys::FILENAME.into(), json!(filename));
        }

        let mut title = None;
        if let Some(pdf) = &pdf {
            let first_page = strip_control_chars(pdf.first_page());
            let extracted = extract_metadata(truncate_chars(&first_page, self.config.fast_path_chars));
            title = extracted.best_title().map(str::to_string);
            metadata.extend(extracted.to_metadata_patch("pdf_fast_path"));

            if let Some(info_title) = &pdf.info_title {
                let info_title = strip_control_chars(info_title);
                metadata.insert(keys::INFO.into(), json!({ "Title": info_title }));
                title = title.or_else(|| {
                    clean_candidate(&info_title).filter(|t| !is_generic_title(t))
                });
            }
        }

        let title = title
            .or_else(|| filename.and_then(filename_title))
            .unwrap_or_else(|| FALLBACK_PDF_TITLE.to_string());
        if !is_generic_title(&title) {
            metadata.insert(keys::DISPLAY_TITLE.into(), json!(title));
        }

        Ok(NewContent {
            workspace_id: workspace_id.to_string(),
            content_type: ContentType::Pdf,
            status: initial_status(&title),
            title,
            raw_url: None,
            metadata,
            file_size: Some(file_size),
            extracted_text: None,
        })
    }

    /// Stores an uploaded file, or loads a previously staged one.
    /// Returns the blob key and the bytes.
    async fn stage_pdf(
        &self,
        workspace_id: &str,
        request: &IngestRequest,
    ) -> Result<(String, Vec<u8>), IngestError> {
        if let Some(bytes) = request.file.as_ref().filter(|b| !b.is_empty()) {
            if bytes.len() > self.config.max_upload_bytes {
                return Err(IngestError::InvalidInput(format!(
                    "file exceeds {} bytes",
                    self.config.max_upload_bytes
                )));
            }
            let key = new_blob_key(workspace_id, "pdf");
            self.blobs.put(&key, bytes).await?;
            debug!(file = %redact_path(&key), bytes = bytes.len(), "Staged upload");
            return Ok((key, bytes.clone()));
        }

        let Some(key) = request
            .storage_path
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
        else {
            return Err(IngestError::InvalidInput(
                "pdf requires a file or a storagePath".into(),
            ));
        };

        match self.blobs.get(key).await {
            Ok(Some(bytes)) => Ok((key.to_string(), bytes)),
            Ok(None) => Err(IngestError::InvalidInput(format!(
                "storagePath '{}' does not exist",
                key
            ))),
            Err(StorageError::InvalidKey(key)) => Err(IngestError::InvalidInput(format!(
                "invalid storagePath '{}'",
                key
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// First-page extraction under the fast-path ceiling. A failure here is
    /// not the caller's problem: the record starts as `processing` and the
    /// background run tries again with the full document.
    async fn fast_path(&self, bytes: Vec<u8>) -> Option<PdfText> {
        let extraction = async move {
            tokio::task::spawn_blocking(move || extract_first_page(&bytes))
                .await
                .map_err(|e| ExtractError::Task(e.to_string()))?
        };

        match bounded(self.config.fast_path_timeout, extraction).await {
            Ok(pdf) => Some(pdf),
            Err(error) => {
                warn!(error = %error, "Fast-path extraction failed");
                None
            }
        }
    }

    async fn prepare_youtube(
        &self,
        workspace_id: &str,
        request: IngestRequest,
    ) -> Result<NewContent, IngestError> {
        let url = request
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| IngestError::InvalidInput("youtube requires a url".into()))?;
        let video_id = parse_video_id(url)
            .ok_or_else(|| IngestError::InvalidInput(format!("not a YouTube video URL: {}", url)))?;

        let video = match tokio::time::timeout(
            self.config.metadata_timeout,
            self.youtube.fetch_metadata(&video_id),
        )
        .await
        {
            Ok(video) => video,
            Err(_) => {
                warn!(video_id = %video_id, "Video metadata lookup timed out");
                VideoMetadata::fallback(&video_id)
            }
        };

        let mut metadata = Metadata::new();
        metadata.insert(keys::VIDEO_ID.into(), json!(video.video_id));
        metadata.insert(keys::THUMBNAIL.into(), json!(video.thumbnail));
        metadata.insert(keys::SOURCE.into(), json!(video.source.as_str()));
        if let Some(channel) = &video.channel_title {
            metadata.insert(keys::CHANNEL_TITLE.into(), json!(channel));
        }
        let title = strip_control_chars(&video.title);
        if !is_generic_title(&title) {
            metadata.insert(keys::DISPLAY_TITLE.into(), json!(title));
        }

        Ok(NewContent {
            workspace_id: workspace_id.to_string(),
            content_type: ContentType::Youtube,
            status: initial_status(&title),
            title,
            raw_url: Some(url.to_string()),
            metadata,
            file_size: None,
            extracted_text: None,
        })
    }
}

fn prepare_text(
    workspace_id: &str,
    request: IngestRequest,
    config: &GatewayConfig,
) -> Result<NewContent, IngestError> {
    let text = request
        .text
        .as_deref()
        .map(strip_control_chars)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| IngestError::InvalidInput("text requires a body".into()))?;

    let extracted = extract_metadata(truncate_chars(&text, config.fast_path_chars));
    let user_title = request
        .title
        .as_deref()
        .map(|t| strip_control_chars(t.trim()))
        .filter(|t| !t.is_empty())
        .map(|t| truncate_chars(&t, MAX_USER_TITLE_CHARS).to_string());

    let mut metadata = extracted.to_metadata_patch("text_heading");
    let title = match user_title {
        Some(title) => {
            metadata.insert(keys::SOURCE.into(), json!("user"));
            metadata.insert(keys::DISPLAY_TITLE.into(), json!(title));
            title
        }
        None => extracted
            .best_title()
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_TEXT_TITLE.to_string()),
    };

    Ok(NewContent {
        workspace_id: workspace_id.to_string(),
        content_type: ContentType::Text,
        status: initial_status(&title),
        title,
        raw_url: None,
        metadata,
        file_size: Some(text.len() as u64),
        extracted_text: Some(text),
    })
}

/// `ready` as soon as a specific title is known.
fn initial_status(title: &str) -> ContentStatus {
    if is_generic_title(title) {
        ContentStatus::Processing
    } else {
        ContentStatus::Ready
    }
}

/// `thermo_notes-ch2.pdf` → `thermo notes-ch2`, unless that is generic.
fn filename_title(filename: &str) -> Option<String> {
    clean_candidate(&filename.replace('_', " ")).filter(|t| !is_generic_title(t))
}
