//! lectern-server: ingestion API plus the background worker pool.
//!
//! Usage: `lectern-server [config.json]`. Without an argument the path in
//! `LECTERN_CONFIG` is used, and without that the built-in defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use lectern::config::{resolve_api_key, LogFormat, LoggingConfig};
use lectern::db::Database;
use lectern::{
    build_router, load_config, AiService, AppState, BlobStore, Config, ContentStore,
    FsBlobStore, Gateway, GatewayConfig, HttpLanguageModel, HttpTranscriptSource, JobQueue,
    Pipeline, PipelineConfig, PoolConfig, TranscriptSource, WorkerPool, YoutubeClient,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.finish())?,
    }
    // The db layer logs through `log`.
    tracing_log::LogTracer::init()?;
    Ok(())
}

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("LECTERN_CONFIG").map(PathBuf::from))
}

fn build_ai(config: &Config) -> Result<Option<AiService>> {
    if !config.ai.enabled {
        return Ok(None);
    }
    let key = resolve_api_key("ai", &config.ai.api_key)?;
    if key.is_none() {
        warn!("AI is enabled but no API key is configured; requests may be rejected");
    }
    let model = HttpLanguageModel::new(&config.ai.base_url, key, config.timeouts.ai())?;
    Ok(Some(AiService::new(
        Arc::new(model),
        config.ai.title_model.clone(),
        config.ai.summary_model.clone(),
        config.extraction.summary_input_chars,
    )))
}

fn build_transcripts(config: &Config) -> Result<Option<Arc<dyn TranscriptSource>>> {
    match config.youtube.transcript_url.as_deref() {
        Some(url) => {
            let source = HttpTranscriptSource::new(url, config.timeouts.transcript())?;
            Ok(Some(Arc::new(source)))
        }
        None => Ok(None),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match config_path() {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    init_logging(&config.logging)?;
    info!("Starting lectern-server v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config.database_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
    let store = ContentStore::new(db.clone());
    let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.blob_directory()));
    info!("Blob directory: {}", config.blob_directory().display());

    let youtube_key = resolve_api_key("youtube", &config.youtube.api_key)?;
    let youtube = Arc::new(YoutubeClient::new(
        &config.youtube.api_base,
        &config.youtube.oembed_url,
        youtube_key,
        config.timeouts.metadata(),
    )?);

    let ai = build_ai(&config)?;
    if ai.is_none() {
        info!("AI disabled; titles stay heuristic and no summaries are generated");
    }
    let transcripts = build_transcripts(&config)?;

    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        Arc::clone(&blobs),
        ai,
        transcripts,
        PipelineConfig::from_config(&config),
    ));

    let queue = JobQueue::new(db);
    let recovered = queue.recover().await?;
    if recovered > 0 {
        info!("Re-queued {} interrupted jobs", recovered);
    }

    let pool = WorkerPool::start(
        queue.clone(),
        Arc::clone(&pipeline),
        PoolConfig {
            worker_count: config.worker_count,
            max_attempts: config.max_job_attempts,
            ..PoolConfig::default()
        },
    );

    let gateway_config = GatewayConfig::from_config(&config);
    let max_upload_bytes = gateway_config.max_upload_bytes;
    let gateway = Gateway::new(blobs, youtube, queue.clone(), gateway_config);

    let app = build_router(AppState {
        store,
        gateway,
        pipeline,
        queue,
        max_upload_bytes,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.shutdown().await;
    info!("Stopped");
    Ok(())
}
