use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ContentApi, OneShotLatch};
use crate::config::ReconcileConfig;
use crate::extract::{is_generic_title, is_suspicious_title};

/// True while `title` is a placeholder or reads like a section heading and
/// fewer than `max_attempts` polls have been made.
pub fn should_poll(title: &str, poll_count: u32, max_attempts: u32) -> bool {
    poll_count < max_attempts && is_suspicious_title(title)
}

/// A fetched title replaces the visible one unless it is a placeholder.
/// Titles therefore only ever improve.
fn improves_on(current: &str, candidate: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty() && candidate != current && !is_generic_title(candidate)
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleOutcome {
    pub title: String,
    pub attempts: u32,
    /// Whether a re-classification was requested during this run.
    pub classified: bool,
    /// The wall-clock ceiling ended the run before the attempts ran out.
    pub timed_out: bool,
}

pub struct TitlePoller {
    api: Arc<dyn ContentApi>,
    config: ReconcileConfig,
    content_id: String,
    classify: OneShotLatch,
}

impl TitlePoller {
    pub fn new(api: Arc<dyn ContentApi>, config: ReconcileConfig, content_id: &str) -> Self {
        Self {
            api,
            config,
            content_id: content_id.to_string(),
            classify: OneShotLatch::new(),
        }
    }

    /// Polls with growing delays while the title still looks wrong. After
    /// `classify_after` attempts a single re-classification is requested.
    /// On the wall-clock ceiling the last known title is returned.
    pub async fn run(&self, current_title: &str) -> TitleOutcome {
        let mut outcome = TitleOutcome {
            title: current_title.to_string(),
            attempts: 0,
            classified: false,
            timed_out: false,
        };

        let limit = self.config.title_timeout();
        if tokio::time::timeout(limit, self.poll(&mut outcome))
            .await
            .is_err()
        {
            info!(content_id = %self.content_id, attempts = outcome.attempts, "Title polling timed out");
            outcome.timed_out = true;
        }
        outcome
    }

    async fn poll(&self, outcome: &mut TitleOutcome) {
        while should_poll(&outcome.title, outcome.attempts, self.config.title_max_attempts) {
            tokio::time::sleep(self.config.title_delay(outcome.attempts)).await;
            outcome.attempts += 1;
            let attempt = outcome.attempts;

            match self.api.content(&self.content_id).await {
                Ok(content) if improves_on(&outcome.title, &content.title) => {
                    debug!(content_id = %self.content_id, attempt, title = %content.title, "Title improved");
                    outcome.title = content.title;
                }
                Ok(_) => {}
                Err(e) => debug!(content_id = %self.content_id, attempt, error = %e, "Poll failed"),
            }

            if attempt >= self.config.classify_after
                && is_suspicious_title(&outcome.title)
                && self.classify.try_fire()
            {
                outcome.classified = true;
                match self.api.classify(&self.content_id).await {
                    Ok(Some(display_title)) if improves_on(&outcome.title, &display_title) => {
                        info!(content_id = %self.content_id, title = %display_title, "Adopted re-classified title");
                        outcome.title = display_title;
                    }
                    Ok(_) => debug!(content_id = %self.content_id, "Re-classification found nothing better"),
                    Err(e) => warn!(content_id = %self.content_id, error = %e, "Re-classification failed"),
                }
            }
        }
    }
}
