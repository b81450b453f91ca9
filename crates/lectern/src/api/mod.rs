//! HTTP API.
//!
//! The ingest route returns as soon as the record exists; everything slow
//! runs in the worker pool and is observed through the content routes.

mod content;
mod error;
mod health;
mod ingest;

pub use error::ApiError;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::ingest::Gateway;
use crate::pipeline::Pipeline;
use crate::store::ContentStore;
use crate::worker::JobQueue;

/// Multipart framing on top of the largest accepted upload.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Shared handles for all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: ContentStore,
    pub gateway: Gateway,
    pub pipeline: Arc<Pipeline>,
    pub queue: JobQueue,
    pub max_upload_bytes: usize,
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(BODY_LIMIT_SLACK);

    Router::new()
        .route("/ingest", post(ingest::ingest))
        .route("/process", post(content::process))
        .route("/content/:id", get(content::get_content))
        .route("/content/:id/processed", get(content::get_processed))
        .route("/content/:id/classify", post(content::classify))
        .route("/content/:id/chat", get(content::get_chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .merge(health::health_routes())
        .with_state(state)
}
