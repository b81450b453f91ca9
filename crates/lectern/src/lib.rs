pub mod ai;
pub mod api;
pub mod chunk;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod pipeline;
pub mod processor;
pub mod reconcile;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod store;
pub mod worker;
pub mod youtube;

pub use ai::{AiService, HttpLanguageModel, LanguageModel};
pub use api::{build_router, ApiError, AppState};
pub use config::{load_config, Config, ReconcileConfig};
pub use content::{Content, ContentStatus, ContentType, ProcessedContent};
pub use error::{ConfigError, IngestError, LecternError, Result, StorageError, WorkerError};
pub use extract::{extract_metadata, ExtractedMetadata};
pub use ingest::{Gateway, GatewayConfig, IngestReceipt, IngestRequest};
pub use pipeline::{Pipeline, PipelineConfig, PipelineError};
pub use reconcile::{HttpContentApi, SummaryPoller, TitlePoller};
pub use secrets::{SecretError, SecretSource};
pub use storage::{BlobStore, FsBlobStore};
pub use store::ContentStore;
pub use worker::{JobQueue, PoolConfig, WorkerPool};
pub use youtube::{HttpTranscriptSource, TranscriptSource, YoutubeClient};
