use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, AppState};
use crate::content::{ChatMessage, Content, ProcessedContent};
use crate::pipeline::Classification;
use crate::worker::JobKind;

#[derive(Debug, Serialize)]
pub struct ProcessedResponse {
    pub content: Content,
    pub processed: Option<ProcessedContent>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub classification: Classification,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub content_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub queued: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessage>,
}

/// GET /content/:id
pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Content>, ApiError> {
    Ok(Json(state.store.get(&id).await?))
}

/// GET /content/:id/processed
pub async fn get_processed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProcessedResponse>, ApiError> {
    let content = state.store.get(&id).await?;
    let processed = state.store.processed(&id).await?;
    Ok(Json(ProcessedResponse { content, processed }))
}

/// POST /content/:id/classify
///
/// Runs at most once per record; repeated calls return the stored result.
pub async fn classify(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let classification = state.pipeline.classify(&id).await?;
    Ok(Json(ClassifyResponse { classification }))
}

/// POST /process
///
/// Queues summary generation for a `ready` or `partial` record. A record
/// that already has a summary, or a summary job already queued, is not
/// queued again.
pub async fn process(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let id = request.content_id.trim();
    if id.is_empty() {
        return Err(ApiError::InvalidInput("contentId is required".into()));
    }

    let content = state.store.get(id).await?;
    if !content.status.awaits_summary() {
        return Err(ApiError::Conflict(format!(
            "Content '{}' is {} and cannot be summarized now",
            id, content.status
        )));
    }

    let has_summary = state
        .store
        .processed(id)
        .await?
        .is_some_and(|p| p.has_summary());
    if has_summary {
        return Ok(Json(ProcessResponse {
            success: true,
            queued: false,
        }));
    }

    let (job, created) = state.queue.submit(id, JobKind::Summarize).await?;
    info!(content_id = %id, job_id = %job.id, created, "Summary requested");
    Ok(Json(ProcessResponse {
        success: true,
        queued: created,
    }))
}

/// GET /content/:id/chat
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, ApiError> {
    state.store.get(&id).await?;
    let messages = state.store.chat_history(&id).await?;
    Ok(Json(ChatResponse { messages }))
}
