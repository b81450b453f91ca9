//! Async façade over the record store.
//!
//! Every write goes through one of these methods so the data-model
//! invariants (monotonic titles, merged metadata, legal status moves,
//! `complete` implies a summary) hold no matter which component writes.

use chrono::Utc;
use tracing::debug;

use crate::content::{
    ChatMessage, Chunk, Content, ContentStatus, Metadata, ProcessedContent,
};
use crate::db::{chat_repo, content_repo, processed_repo, Database, DatabaseError};

#[derive(Clone)]
pub struct ContentStore {
    db: Database,
}

impl ContentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Creates a content record with a fresh id and returns it.
    #[cfg(test)]
    pub(crate) async fn create(
        &self,
        new: crate::content::NewContent,
    ) -> Result<Content, DatabaseError> {
        let content = new.into_content(Utc::now());
        let row = content.clone();
        self.db
            .call(move |db| content_repo::insert(db, &row))
            .await?;
        debug!(content_id = %content.id, status = %content.status, "Created content record");
        Ok(content)
    }

    pub async fn find(&self, id: &str) -> Result<Option<Content>, DatabaseError> {
        let id = id.to_string();
        self.db.call(move |db| content_repo::find_by_id(db, &id)).await
    }

    /// Like [`find`](Self::find) but a missing record is an error.
    pub async fn get(&self, id: &str) -> Result<Content, DatabaseError> {
        let id = id.to_string();
        self.db.call(move |db| content_repo::get(db, &id)).await
    }

    pub async fn processed(&self, id: &str) -> Result<Option<ProcessedContent>, DatabaseError> {
        let id = id.to_string();
        self.db
            .call(move |db| processed_repo::find_by_content_id(db, &id))
            .await
    }

    /// Monotonic title update. Returns whether the title changed.
    pub async fn update_title(&self, id: &str, title: &str) -> Result<bool, DatabaseError> {
        let (id, title) = (id.to_string(), title.to_string());
        self.db
            .call(move |db| content_repo::update_title(db, &id, &title, Utc::now()))
            .await
    }

    /// Read-modify-write merge into the metadata bag. Returns the merged bag.
    pub async fn merge_metadata(&self, id: &str, patch: Metadata) -> Result<Metadata, DatabaseError> {
        if patch.is_empty() {
            return self.get(id).await.map(|c| c.metadata);
        }
        let id = id.to_string();
        self.db
            .call(move |db| content_repo::merge_metadata(db, &id, patch, Utc::now()))
            .await
    }

    /// Sets `key` only if absent. `None` means this call claimed it.
    pub async fn claim_metadata(
        &self,
        id: &str,
        key: &str,
        value: serde_json::Value,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let (id, key) = (id.to_string(), key.to_string());
        self.db
            .call(move |db| {
                content_repo::insert_metadata_if_absent(db, &id, &key, value, Utc::now())
            })
            .await
    }

    /// Validated status transition. Returns the previous status.
    pub async fn set_status(
        &self,
        id: &str,
        next: ContentStatus,
    ) -> Result<ContentStatus, DatabaseError> {
        let owned = id.to_string();
        let previous = self
            .db
            .call(move |db| content_repo::set_status(db, &owned, next, Utc::now()))
            .await?;
        if previous != next {
            debug!(content_id = %id, from = %previous, to = %next, "Status changed");
        }
        Ok(previous)
    }

    pub async fn set_extracted_text(&self, id: &str, text: &str) -> Result<(), DatabaseError> {
        let (id, text) = (id.to_string(), text.to_string());
        self.db
            .call(move |db| content_repo::set_extracted_text(db, &id, &text, Utc::now()))
            .await
    }

    /// Replaces the chunk list wholesale; keeps an existing summary unless
    /// a new one is given.
    pub async fn upsert_processed(
        &self,
        id: &str,
        chunks: Vec<Chunk>,
        transcript: Option<String>,
    ) -> Result<(), DatabaseError> {
        let id = id.to_string();
        self.db
            .call(move |db| {
                processed_repo::upsert(db, &id, &chunks, None, transcript.as_deref(), Utc::now())
            })
            .await
    }

    pub async fn set_summary(&self, id: &str, summary: &str) -> Result<(), DatabaseError> {
        let (id, summary) = (id.to_string(), summary.to_string());
        self.db
            .call(move |db| processed_repo::set_summary(db, &id, &summary, Utc::now()))
            .await
    }

    pub async fn chat_history(&self, id: &str) -> Result<Vec<ChatMessage>, DatabaseError> {
        let id = id.to_string();
        self.db
            .call(move |db| chat_repo::list_for_content(db, &id))
            .await
    }

    pub async fn append_chat(&self, id: &str, message: ChatMessage) -> Result<(), DatabaseError> {
        let id = id.to_string();
        self.db
            .call(move |db| chat_repo::insert(db, &id, &message))
            .await
    }
}
