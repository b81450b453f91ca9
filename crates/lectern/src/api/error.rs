use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::db::DatabaseError;
use crate::error::{IngestError, WorkerError};
use crate::pipeline::PipelineError;

/// HTTP-facing error. Serialized as `{"error": {"code", "message"}}`.
#[derive(Debug)]
pub enum ApiError {
    InvalidInput(String),
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &str) {
        match self {
            ApiError::InvalidInput(m) => (StatusCode::BAD_REQUEST, "invalid_input", m.as_str()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", m.as_str()),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", m.as_str()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            error!(code, message = %message, "Request failed");
        }
        let body = Json(json!({
            "error": { "code": code, "message": message },
        }));
        (status, body).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            _ if e.is_not_found() => ApiError::NotFound(e.to_string()),
            DatabaseError::InvalidTransition { .. } | DatabaseError::MissingSummary { .. } => {
                ApiError::Conflict(e.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::ShutDown => ApiError::Unavailable(e.to_string()),
            WorkerError::Database(db) => db.into(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Persistence(db) => db.into(),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::InvalidInput(m) => ApiError::InvalidInput(m),
            IngestError::ExtractionFailure(_) | IngestError::Storage(_) => {
                ApiError::Internal(e.to_string())
            }
            IngestError::Persistence(db) => ApiError::Internal(db.to_string()),
            IngestError::Scheduling(w) => w.into(),
        }
    }
}
