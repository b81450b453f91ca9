//! One-shot re-classification of a record whose title still looks wrong.
//!
//! The first attempt claims `metadata.classification` before doing any work,
//! so repeat or concurrent requests (from any client) return the stored
//! answer without re-running.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, info_span, Instrument};

use crate::content::{keys, Content, Metadata, ProcessedContent};
use crate::extract::{extract_metadata, is_suspicious_title, SCAN_CHARS};
use crate::sanitize::truncate_chars;

use super::error::PipelineError;
use super::runner::{bounded, info_title_candidate, Pipeline};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub display_title: Option<String>,
    /// True when this is the stored result of an earlier attempt.
    pub cached: bool,
}

impl Pipeline {
    /// Re-derives the display title for `content_id`, at most once per record.
    ///
    /// A missing record is [`DatabaseError::NotFound`](crate::db::DatabaseError::NotFound).
    pub async fn classify(&self, content_id: &str) -> Result<Classification, PipelineError> {
        let content = self.store.get(content_id).await?;

        if let Some(previous) = content
            .metadata
            .get(keys::CLASSIFICATION)
            .and_then(stored_classification)
        {
            debug!(content_id = %content_id, "Returning stored classification");
            return Ok(previous);
        }

        // Claim the slot; a concurrent request that got there first wins.
        let marker = json!({
            "display_title": null,
            "attempted_at": Utc::now().to_rfc3339(),
        });
        if let Some(existing) = self
            .store
            .claim_metadata(content_id, keys::CLASSIFICATION, marker)
            .await?
        {
            debug!(content_id = %content_id, "Classification already claimed");
            return Ok(stored_classification(&existing).unwrap_or(Classification {
                display_title: None,
                cached: true,
            }));
        }

        let span = info_span!("classify", content_id = %content_id);
        async {
            let processed = self.store.processed(content_id).await?;
            let display_title = self.derive_title(&content, processed.as_ref()).await;

            let mut patch = Metadata::new();
            patch.insert(
                keys::CLASSIFICATION.into(),
                json!({
                    "display_title": display_title,
                    "attempted_at": Utc::now().to_rfc3339(),
                }),
            );
            if let Some(title) = &display_title {
                patch.insert(keys::DISPLAY_TITLE.into(), json!(title));
                self.store.update_title(content_id, title).await?;
            }
            self.store.merge_metadata(content_id, patch).await?;

            info!(display_title = ?display_title, "Classified content");
            Ok(Classification {
                display_title,
                cached: false,
            })
        }
        .instrument(span)
        .await
    }

    /// Model first (first page only), then heuristics over the stored text,
    /// then the document information title.
    async fn derive_title(
        &self,
        content: &Content,
        processed: Option<&ProcessedContent>,
    ) -> Option<String> {
        let text = classification_text(content, processed);

        if let (Some(ai), Some(text)) = (&self.ai, text.as_deref()) {
            match bounded(self.config.ai_timeout, ai.refine_title(text)).await {
                Ok(title) => return Some(title),
                Err(e) => debug!(error = %e, "Model classification discarded"),
            }
        }

        text.as_deref()
            .and_then(|t| extract_metadata(t).best_title().map(str::to_string))
            .or_else(|| info_title_candidate(&content.metadata))
            .filter(|t| !is_suspicious_title(t))
    }
}

fn stored_classification(stored: &serde_json::Value) -> Option<Classification> {
    let stored = stored.as_object()?;
    Some(Classification {
        display_title: stored
            .get("display_title")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        cached: true,
    })
}

/// First-page chunks for PDFs, else the head of the stored text or transcript.
fn classification_text(content: &Content, processed: Option<&ProcessedContent>) -> Option<String> {
    if let Some(processed) = processed {
        let first_page: String = processed
            .chunks
            .iter()
            .filter(|c| c.page == Some(1))
            .map(|c| c.text.as_str())
            .collect();
        if !first_page.trim().is_empty() {
            return Some(first_page);
        }
    }

    content
        .extracted_text
        .as_deref()
        .or_else(|| processed.and_then(|p| p.transcript.as_deref()))
        .filter(|t| !t.trim().is_empty())
        .map(|t| truncate_chars(t, SCAN_CHARS).to_string())
}
