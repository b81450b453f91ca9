use std::sync::Arc;

use tracing::debug;

use super::prompt::{self, parse_title_reply};
use super::{AiError, CompletionRequest, LanguageModel};
use crate::extract::{clean_candidate, is_suspicious_title};
use crate::sanitize::truncate_chars;

/// Characters of the first page sent to the title model.
const TITLE_INPUT_CHARS: usize = 3000;

/// Title refinement and summarization on top of a [`LanguageModel`].
#[derive(Clone)]
pub struct AiService {
    model: Arc<dyn LanguageModel>,
    title_model: String,
    summary_model: String,
    summary_input_chars: usize,
}

impl AiService {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        title_model: impl Into<String>,
        summary_model: impl Into<String>,
        summary_input_chars: usize,
    ) -> Self {
        Self {
            model,
            title_model: title_model.into(),
            summary_model: summary_model.into(),
            summary_input_chars,
        }
    }

    /// Asks the fast model for a title from the first page only.
    ///
    /// Output that the heuristics would reject (subject names, section
    /// headings, placeholders) comes back as [`AiError::Rejected`].
    pub async fn refine_title(&self, first_page: &str) -> Result<String, AiError> {
        let reply = self
            .model
            .complete(CompletionRequest {
                model: self.title_model.clone(),
                system: prompt::TITLE_SYSTEM.to_string(),
                user: prompt::title_user_prompt(truncate_chars(first_page, TITLE_INPUT_CHARS)),
                max_tokens: 48,
                temperature: 0.0,
            })
            .await?;

        let raw = parse_title_reply(&reply).ok_or(AiError::Empty)?;
        let title = clean_candidate(&raw).ok_or_else(|| AiError::Rejected(raw.clone()))?;
        if is_suspicious_title(&title) {
            return Err(AiError::Rejected(title));
        }

        debug!(title = %title, "Model proposed a title");
        Ok(title)
    }

    /// Summarizes the text, truncated to the configured input size.
    pub async fn summarize(&self, text: &str) -> Result<String, AiError> {
        let input = truncate_chars(text, self.summary_input_chars);
        if input.trim().is_empty() {
            return Err(AiError::Empty);
        }

        let summary = self
            .model
            .complete(CompletionRequest {
                model: self.summary_model.clone(),
                system: prompt::SUMMARY_SYSTEM.to_string(),
                user: prompt::summary_user_prompt(input),
                max_tokens: 512,
                temperature: 0.2,
            })
            .await?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(AiError::Empty);
        }
        Ok(summary.to_string())
    }
}
