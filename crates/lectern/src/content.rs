//! Content model shared by the gateway, the background processor, the
//! record store and the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Open attribute bag stored alongside each content record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Well-known keys of the [`Metadata`] bag.
pub mod keys {
    pub const DISPLAY_TITLE: &str = "display_title";
    pub const CHAPTER: &str = "chapter";
    pub const CHAPTER_NUMBER: &str = "chapter_number";
    pub const GRADE: &str = "grade";
    pub const SOURCE: &str = "source";
    pub const STORAGE_PATH: &str = "storagePath";
    pub const FILENAME: &str = "filename";
    pub const THUMBNAIL: &str = "thumbnail";
    pub const CHANNEL_TITLE: &str = "channelTitle";
    pub const VIDEO_ID: &str = "videoId";
    /// Upstream document information (`info.Title` for PDFs).
    pub const INFO: &str = "info";
    pub const INFO_TITLE: &str = "Title";
    pub const CLASSIFICATION: &str = "classification";
    pub const PROCESSING_ERROR: &str = "processing_error";
}

/// Merges `patch` into `target`. Nested objects merge recursively; any
/// other value replaces the existing one. Keys absent from `patch` survive.
pub fn merge_metadata(target: &mut Metadata, patch: Metadata) {
    for (key, value) in patch {
        if let serde_json::Value::Object(nested) = value {
            if let Some(serde_json::Value::Object(existing)) = target.get_mut(&key) {
                merge_metadata(existing, nested);
                continue;
            }
            target.insert(key, serde_json::Value::Object(nested));
        } else {
            target.insert(key, value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pdf,
    Youtube,
    Text,
    Audio,
    Video,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Pdf => "pdf",
            ContentType::Youtube => "youtube",
            ContentType::Text => "text",
            ContentType::Audio => "audio",
            ContentType::Video => "video",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ContentType::Pdf),
            "youtube" => Ok(ContentType::Youtube),
            "text" => Ok(ContentType::Text),
            "audio" => Ok(ContentType::Audio),
            "video" => Ok(ContentType::Video),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

/// Lifecycle state of a content record.
///
/// ```text
/// processing ──► ready ──► complete
///      │           │  ▲        │
///      │           ▼  │        │
///      └──────► partial ───────┘
///   (any) ──► error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Processing,
    Ready,
    Partial,
    Complete,
    Error,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Processing => "processing",
            ContentStatus::Ready => "ready",
            ContentStatus::Partial => "partial",
            ContentStatus::Complete => "complete",
            ContentStatus::Error => "error",
        }
    }

    /// Returns true if the state machine allows moving from `self` to `next`.
    ///
    /// Staying in the same state is always allowed.
    pub fn can_transition_to(&self, next: ContentStatus) -> bool {
        use ContentStatus::*;

        if *self == next {
            return true;
        }
        match (self, next) {
            (_, Error) => true,
            (Processing, Ready | Partial) => true,
            (Ready, Partial | Complete) => true,
            // Reprocessing can recover a partial record.
            (Partial, Ready | Complete) => true,
            _ => false,
        }
    }

    /// States from which a summary may still be generated.
    pub fn awaits_summary(&self) -> bool {
        matches!(self, ContentStatus::Ready | ContentStatus::Partial)
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ContentStatus::Processing),
            "ready" => Ok(ContentStatus::Ready),
            "partial" => Ok(ContentStatus::Partial),
            "complete" => Ok(ContentStatus::Complete),
            "error" => Ok(ContentStatus::Error),
            other => Err(format!("unknown content status '{}'", other)),
        }
    }
}

/// One ingested learning artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    pub id: String,
    pub workspace_id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub title: String,
    pub raw_url: Option<String>,
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub file_size: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// The blob key of the staged upload, if any.
    pub fn storage_path(&self) -> Option<&str> {
        self.metadata_str(keys::STORAGE_PATH)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Fields needed to create a content record. Only the gateway builds these.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub workspace_id: String,
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub title: String,
    pub raw_url: Option<String>,
    pub metadata: Metadata,
    pub file_size: Option<u64>,
    /// Body for text notes, known at ingestion time.
    pub extracted_text: Option<String>,
}

impl NewContent {
    /// Assigns an id and timestamps.
    pub fn into_content(self, now: DateTime<Utc>) -> Content {
        Content {
            id: uuid::Uuid::new_v4().to_string(),
            workspace_id: self.workspace_id,
            content_type: self.content_type,
            status: self.status,
            title: self.title,
            raw_url: self.raw_url,
            extracted_text: self.extracted_text,
            metadata: self.metadata,
            file_size: self.file_size,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A contiguous span of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Start offset in seconds for transcript chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// Derived artifacts for a content record, one-to-one by content id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedContent {
    pub content_id: String,
    pub chunks: Vec<Chunk>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessedContent {
    pub fn has_summary(&self) -> bool {
        self.summary.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A chat message as held by the server or optimistically by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Set on client-side optimistic messages not yet confirmed by the server.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pending: bool,
}
