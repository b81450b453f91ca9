//! Client-side reconciliation: converging a view of one content record with
//! the server while background processing finishes.
//!
//! Every loop here is bounded by both an attempt count and a wall-clock
//! ceiling, so a job that never finishes cannot keep a client polling.

pub mod chat;
pub mod client;
pub mod latch;
pub mod summary;
pub mod title;

pub use chat::{merge_chat_history, refresh_chat, ChatMerge, MergeOutcome, MergePolicy};
pub use client::HttpContentApi;
pub use latch::OneShotLatch;
pub use summary::{SummaryOutcome, SummaryPoller};
pub use title::{should_poll, TitleOutcome, TitlePoller};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::content::{ChatMessage, Content, ProcessedContent};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ResponseParse(String),

    #[error("Content not found: {0}")]
    NotFound(String),
}

/// `GET /content/{id}/processed` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessedView {
    pub content: Content,
    pub processed: Option<ProcessedContent>,
}

impl ProcessedView {
    /// The summary, if present and non-blank.
    pub fn summary(&self) -> Option<&str> {
        self.processed
            .as_ref()
            .and_then(|p| p.summary.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// The server endpoints the pollers talk to.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn content(&self, id: &str) -> Result<Content, ClientError>;

    async fn processed(&self, id: &str) -> Result<ProcessedView, ClientError>;

    /// `POST /process`; returns whether a new job was queued.
    async fn request_summary(&self, id: &str) -> Result<bool, ClientError>;

    /// `POST /content/{id}/classify`; returns the display title, if any.
    async fn classify(&self, id: &str) -> Result<Option<String>, ClientError>;

    async fn chat_history(&self, id: &str) -> Result<Vec<ChatMessage>, ClientError>;
}
