//! LLM-assisted title refinement and summarization.
//!
//! Both passes are best-effort: callers treat every [`AiError`] as "keep
//! what the heuristics produced".

pub mod client;
pub mod prompt;
pub(crate) mod service;

pub use client::HttpLanguageModel;
pub use service::AiService;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI is not configured")]
    Disabled,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse model response: {0}")]
    ResponseParse(String),

    #[error("Model returned an empty response")]
    Empty,

    /// The model answered with something the title denylist rejects.
    #[error("Rejected model output: {0}")]
    Rejected(String),
}

/// One chat-style completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AiError>;
}
