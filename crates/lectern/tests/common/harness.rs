//! Test harness for isolated end-to-end runs.
//!
//! Each harness owns an in-memory database, a temporary blob directory and
//! one wiremock server standing in for YouTube, the caption service and the
//! language model.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;
use wiremock::MockServer;

use lectern::content::Content;
use lectern::db::Database;
use lectern::{
    build_router, AiService, AppState, BlobStore, ContentStore, FsBlobStore, Gateway,
    GatewayConfig, HttpLanguageModel, HttpTranscriptSource, JobQueue, Pipeline, PipelineConfig,
    PoolConfig, TranscriptSource, WorkerPool, YoutubeClient,
};

use super::builders::{SUMMARY_MODEL, TITLE_MODEL};

pub struct TestHarness {
    _temp_dir: TempDir,
    pub mock: MockServer,
    pub store: ContentStore,
    pub blobs: Arc<FsBlobStore>,
    pub queue: JobQueue,
    pub pipeline: Arc<Pipeline>,
    pub gateway: Gateway,
}

impl TestHarness {
    /// Harness without a language model: titles stay heuristic and no
    /// summaries are produced.
    pub async fn new() -> Self {
        Self::build(false).await
    }

    /// Harness whose language model is the mock server's `/v1` endpoint.
    pub async fn with_ai() -> Self {
        Self::build(true).await
    }

    async fn build(ai_enabled: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mock = MockServer::start().await;

        let db = Database::open_in_memory().expect("Failed to open database");
        let store = ContentStore::new(db.clone());
        let blobs = Arc::new(FsBlobStore::new(temp_dir.path().join("blobs")));
        let queue = JobQueue::new(db);

        let youtube = YoutubeClient::new(
            &format!("{}/youtube/v3", mock.uri()),
            &format!("{}/oembed", mock.uri()),
            None,
            Duration::from_secs(2),
        )
        .expect("Failed to build YouTube client");

        let ai = ai_enabled.then(|| {
            let model = HttpLanguageModel::new(
                &format!("{}/v1", mock.uri()),
                None,
                Duration::from_secs(2),
            )
            .expect("Failed to build model client");
            AiService::new(Arc::new(model), TITLE_MODEL, SUMMARY_MODEL, 4000)
        });

        let transcripts: Arc<dyn TranscriptSource> = Arc::new(
            HttpTranscriptSource::new(&mock.uri(), Duration::from_secs(2))
                .expect("Failed to build transcript client"),
        );

        let blob_store: Arc<dyn BlobStore> = blobs.clone();
        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            Arc::clone(&blob_store),
            ai,
            Some(transcripts),
            PipelineConfig::default(),
        ));

        let gateway = Gateway::new(
            blob_store,
            Arc::new(youtube),
            queue.clone(),
            GatewayConfig::default(),
        );

        Self {
            _temp_dir: temp_dir,
            mock,
            store,
            blobs,
            queue,
            pipeline,
            gateway,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            store: self.store.clone(),
            gateway: self.gateway.clone(),
            pipeline: Arc::clone(&self.pipeline),
            queue: self.queue.clone(),
            max_upload_bytes: GatewayConfig::default().max_upload_bytes,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state())
    }

    /// Starts a single worker that polls often.
    pub fn start_workers(&self) -> WorkerPool {
        WorkerPool::start(
            self.queue.clone(),
            Arc::clone(&self.pipeline),
            PoolConfig {
                worker_count: 1,
                max_attempts: 3,
                poll_interval: Duration::from_millis(20),
            },
        )
    }

    /// Re-reads the record until `done` holds, panicking after `timeout`.
    pub async fn wait_for<F>(&self, id: &str, timeout: Duration, done: F) -> Content
    where
        F: Fn(&Content) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let content = self.store.get(id).await.expect("content should exist");
            if done(&content) {
                return content;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!(
                    "Timed out waiting on content {}: status={} title={:?}",
                    id, content.status, content.title
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}
