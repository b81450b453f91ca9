use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use super::{ApiError, AppState};
use crate::ingest::IngestRequest;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub content_id: String,
}

/// POST /ingest
///
/// Multipart form: `type`, `workspaceId`, then `file` (+ `filename`) or
/// `storagePath` for PDFs, `url` for videos, `text` (+ `title`) for notes.
pub async fn ingest(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let request = read_form(multipart).await?;
    let receipt = state.gateway.ingest(request).await?;
    Ok(Json(IngestResponse {
        success: true,
        content_id: receipt.content_id,
    }))
}

async fn read_form(mut multipart: Multipart) -> Result<IngestRequest, ApiError> {
    let mut request = IngestRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Malformed form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            if request.filename.is_none() {
                request.filename = field.file_name().map(str::to_string);
            }
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidInput(format!("Unreadable file: {}", e)))?;
            request.file = Some(bytes.to_vec());
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("Unreadable field '{}': {}", name, e)))?;
        match name.as_str() {
            "type" => request.content_type = value,
            "workspaceId" => request.workspace_id = value,
            "filename" => request.filename = Some(value),
            "storagePath" => request.storage_path = Some(value),
            "url" => request.url = Some(value),
            "text" => request.text = Some(value),
            "title" => request.title = Some(value),
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(request)
}
