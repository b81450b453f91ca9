use tracing::{debug, warn};

use super::{ClientError, ContentApi};
use crate::content::ChatMessage;

/// What to do with local messages the server does not know about whenever
/// the server list is adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Adopt the server list as is; local-only messages are dropped.
    ServerAuthoritative,
    /// Adopt the server list, then re-append local messages still marked
    /// pending that the server does not know about.
    #[default]
    KeepPending,
}

/// `kept_pending` counts the local pending messages re-appended after the
/// server list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Unchanged,
    /// The server has more messages.
    AdoptedLonger { kept_pending: usize },
    /// Same length, but the last message was updated in place.
    AdoptedUpdated { kept_pending: usize },
    /// The server has fewer messages than the client.
    ServerShorter { kept_pending: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMerge {
    pub messages: Vec<ChatMessage>,
    pub outcome: MergeOutcome,
}

/// Adopts `server`, re-appending unsent local messages under `KeepPending`.
/// Returns the merged list and how many local messages were kept.
fn adopt(
    local: &[ChatMessage],
    server: Vec<ChatMessage>,
    policy: MergePolicy,
) -> (Vec<ChatMessage>, usize) {
    let mut messages = server;
    if policy == MergePolicy::ServerAuthoritative {
        return (messages, 0);
    }
    let pending: Vec<ChatMessage> = local
        .iter()
        .filter(|m| m.pending && !messages.iter().any(|s| s.id == m.id))
        .cloned()
        .collect();
    let kept = pending.len();
    messages.extend(pending);
    (messages, kept)
}

/// Merges a freshly fetched server history into the local one.
pub fn merge_chat_history(
    local: &[ChatMessage],
    server: Vec<ChatMessage>,
    policy: MergePolicy,
) -> ChatMerge {
    use std::cmp::Ordering;

    match server.len().cmp(&local.len()) {
        Ordering::Greater => {
            let (messages, kept_pending) = adopt(local, server, policy);
            ChatMerge {
                messages,
                outcome: MergeOutcome::AdoptedLonger { kept_pending },
            }
        }
        Ordering::Equal => {
            let last_changed = match (local.last(), server.last()) {
                (Some(l), Some(s)) => l.id != s.id || l.content != s.content,
                _ => false,
            };
            if last_changed {
                let (messages, kept_pending) = adopt(local, server, policy);
                ChatMerge {
                    messages,
                    outcome: MergeOutcome::AdoptedUpdated { kept_pending },
                }
            } else {
                ChatMerge {
                    messages: local.to_vec(),
                    outcome: MergeOutcome::Unchanged,
                }
            }
        }
        Ordering::Less => {
            warn!(
                local = local.len(),
                server = server.len(),
                "Server chat history is shorter than local history"
            );
            let (messages, kept_pending) = adopt(local, server, policy);
            ChatMerge {
                messages,
                outcome: MergeOutcome::ServerShorter { kept_pending },
            }
        }
    }
}

/// Fetches the server history for `content_id` and merges it into `local`.
pub async fn refresh_chat(
    api: &dyn ContentApi,
    content_id: &str,
    local: &[ChatMessage],
    policy: MergePolicy,
) -> Result<ChatMerge, ClientError> {
    let server = api.chat_history(content_id).await?;
    let merge = merge_chat_history(local, server, policy);
    debug!(content_id = %content_id, outcome = ?merge.outcome, "Chat history merged");
    Ok(merge)
}
