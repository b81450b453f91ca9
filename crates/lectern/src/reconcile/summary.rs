use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ContentApi, OneShotLatch};
use crate::config::ReconcileConfig;
use crate::content::ContentStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    /// A summary was already known; nothing was requested.
    Present(String),
    /// The summary appeared while polling.
    Arrived(String),
    /// The record is not in a state that can get a summary.
    NotApplicable(ContentStatus),
    /// The server moved the record to `error`.
    Failed,
    /// Attempt or wall-clock ceiling reached; the last known state stands.
    TimedOut,
}

/// Waits for one record's summary, asking the server to generate it at most
/// once per poller.
pub struct SummaryPoller {
    api: Arc<dyn ContentApi>,
    config: ReconcileConfig,
    content_id: String,
    trigger: OneShotLatch,
}

impl SummaryPoller {
    pub fn new(api: Arc<dyn ContentApi>, config: ReconcileConfig, content_id: &str) -> Self {
        Self {
            api,
            config,
            content_id: content_id.to_string(),
            trigger: OneShotLatch::new(),
        }
    }

    /// Runs until a summary shows up, the record fails, or either ceiling is
    /// hit. Safe to call again: the generation request is not repeated.
    pub async fn run(&self, status: ContentStatus, summary: Option<&str>) -> SummaryOutcome {
        if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
            return SummaryOutcome::Present(summary.to_string());
        }
        if !status.awaits_summary() {
            return SummaryOutcome::NotApplicable(status);
        }

        if self.trigger.try_fire() {
            match self.api.request_summary(&self.content_id).await {
                Ok(queued) => debug!(content_id = %self.content_id, queued, "Summary requested"),
                Err(e) => warn!(content_id = %self.content_id, error = %e, "Summary request failed"),
            }
        }

        match tokio::time::timeout(self.config.summary_timeout(), self.poll()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                info!(content_id = %self.content_id, "Summary polling timed out");
                SummaryOutcome::TimedOut
            }
        }
    }

    async fn poll(&self) -> SummaryOutcome {
        for attempt in 1..=self.config.summary_max_attempts {
            tokio::time::sleep(self.config.summary_interval()).await;

            match self.api.processed(&self.content_id).await {
                Ok(view) => {
                    if let Some(summary) = view.summary() {
                        debug!(content_id = %self.content_id, attempt, "Summary arrived");
                        return SummaryOutcome::Arrived(summary.to_string());
                    }
                    if view.content.status == ContentStatus::Error {
                        return SummaryOutcome::Failed;
                    }
                }
                Err(e) => debug!(content_id = %self.content_id, attempt, error = %e, "Poll failed"),
            }
        }
        info!(content_id = %self.content_id, "Summary polling gave up");
        SummaryOutcome::TimedOut
    }
}
