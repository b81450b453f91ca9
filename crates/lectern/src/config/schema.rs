use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::db::default_database_path;
use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    /// Defaults to `~/.lectern/data/lectern.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    /// Defaults to `~/.lectern/blobs`.
    #[serde(default)]
    pub blob_directory: Option<String>,
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_max_job_attempts")]
    pub max_job_attempts: u32,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_max_job_attempts() -> u32 {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            server: ServerConfig::default(),
            database_path: None,
            blob_directory: None,
            worker_count: default_worker_count(),
            max_job_attempts: default_max_job_attempts(),
            extraction: ExtractionConfig::default(),
            timeouts: TimeoutConfig::default(),
            youtube: YoutubeConfig::default(),
            ai: AiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        match &self.database_path {
            Some(path) => PathBuf::from(path),
            None => default_database_path()
                .unwrap_or_else(|| data_root().join("data").join("lectern.db")),
        }
    }

    pub fn blob_directory(&self) -> PathBuf {
        match &self.blob_directory {
            Some(path) => PathBuf::from(path),
            None => data_root().join("blobs"),
        }
    }
}

/// `~/.lectern`, or `./.lectern` when there is no home directory.
fn data_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lectern")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Characters of the first page the gateway scans for a title.
    #[serde(default = "default_fast_path_chars")]
    pub fast_path_chars: usize,
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    /// Characters of extracted text sent to the summary model.
    #[serde(default = "default_summary_input_chars")]
    pub summary_input_chars: usize,
    /// Largest accepted upload.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_fast_path_chars() -> usize {
    4000
}

fn default_chunk_chars() -> usize {
    1200
}

fn default_summary_input_chars() -> usize {
    12_000
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fast_path_chars: default_fast_path_chars(),
            chunk_chars: default_chunk_chars(),
            summary_input_chars: default_summary_input_chars(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Per-call ceilings, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_fast_path_secs")]
    pub fast_path_secs: u64,
    #[serde(default = "default_extraction_secs")]
    pub extraction_secs: u64,
    #[serde(default = "default_metadata_secs")]
    pub metadata_secs: u64,
    #[serde(default = "default_transcript_secs")]
    pub transcript_secs: u64,
    #[serde(default = "default_ai_secs")]
    pub ai_secs: u64,
}

fn default_fast_path_secs() -> u64 {
    10
}

fn default_extraction_secs() -> u64 {
    120
}

fn default_metadata_secs() -> u64 {
    8
}

fn default_transcript_secs() -> u64 {
    30
}

fn default_ai_secs() -> u64 {
    60
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            fast_path_secs: default_fast_path_secs(),
            extraction_secs: default_extraction_secs(),
            metadata_secs: default_metadata_secs(),
            transcript_secs: default_transcript_secs(),
            ai_secs: default_ai_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn fast_path(&self) -> Duration {
        Duration::from_secs(self.fast_path_secs)
    }

    pub fn extraction(&self) -> Duration {
        Duration::from_secs(self.extraction_secs)
    }

    pub fn metadata(&self) -> Duration {
        Duration::from_secs(self.metadata_secs)
    }

    pub fn transcript(&self) -> Duration {
        Duration::from_secs(self.transcript_secs)
    }

    pub fn ai(&self) -> Duration {
        Duration::from_secs(self.ai_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Data API key. Without one, titles come from oEmbed.
    #[serde(flatten)]
    pub api_key: SecretSource,
    #[serde(default = "default_youtube_api_base")]
    pub api_base: String,
    #[serde(default = "default_oembed_url")]
    pub oembed_url: String,
    /// Caption service; transcripts are skipped when unset.
    #[serde(default)]
    pub transcript_url: Option<String>,
}

fn default_youtube_api_base() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_oembed_url() -> String {
    "https://www.youtube.com/oembed".to_string()
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: SecretSource::from_env_var("YOUTUBE_API_KEY"),
            api_base: default_youtube_api_base(),
            oembed_url: default_oembed_url(),
            transcript_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OpenAI-compatible endpoint root, e.g. `https://api.openai.com/v1`.
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(flatten)]
    pub api_key: SecretSource,
    /// Fast model used for title refinement.
    #[serde(default = "default_title_model")]
    pub title_model: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
}

fn default_ai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_title_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_summary_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_ai_base_url(),
            api_key: SecretSource::from_env_var("LECTERN_AI_API_KEY"),
            title_model: default_title_model(),
            summary_model: default_summary_model(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,lectern=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

/// Client-side polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Delay between processed-content fetches.
    #[serde(default = "default_summary_interval_ms")]
    pub summary_interval_ms: u64,
    /// Wall-clock ceiling for summary polling.
    #[serde(default = "default_summary_timeout_ms")]
    pub summary_timeout_ms: u64,
    /// Attempt ceiling for summary polling, enforced alongside the timeout.
    #[serde(default = "default_summary_max_attempts")]
    pub summary_max_attempts: u32,
    #[serde(default = "default_title_max_attempts")]
    pub title_max_attempts: u32,
    /// Wall-clock ceiling for title polling, enforced alongside the attempts.
    #[serde(default = "default_title_timeout_ms")]
    pub title_timeout_ms: u64,
    #[serde(default = "default_title_base_delay_ms")]
    pub title_base_delay_ms: u64,
    #[serde(default = "default_title_growth")]
    pub title_growth: f64,
    #[serde(default = "default_title_max_delay_ms")]
    pub title_max_delay_ms: u64,
    /// Title attempts before a re-classification is requested.
    #[serde(default = "default_classify_after")]
    pub classify_after: u32,
}

fn default_summary_interval_ms() -> u64 {
    2_000
}

fn default_summary_timeout_ms() -> u64 {
    120_000
}

fn default_summary_max_attempts() -> u32 {
    60
}

fn default_title_max_attempts() -> u32 {
    15
}

fn default_title_timeout_ms() -> u64 {
    120_000
}

fn default_title_base_delay_ms() -> u64 {
    1_000
}

fn default_title_growth() -> f64 {
    1.5
}

fn default_title_max_delay_ms() -> u64 {
    10_000
}

fn default_classify_after() -> u32 {
    5
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            summary_interval_ms: default_summary_interval_ms(),
            summary_timeout_ms: default_summary_timeout_ms(),
            summary_max_attempts: default_summary_max_attempts(),
            title_max_attempts: default_title_max_attempts(),
            title_timeout_ms: default_title_timeout_ms(),
            title_base_delay_ms: default_title_base_delay_ms(),
            title_growth: default_title_growth(),
            title_max_delay_ms: default_title_max_delay_ms(),
            classify_after: default_classify_after(),
        }
    }
}

impl ReconcileConfig {
    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }

    pub fn summary_timeout(&self) -> Duration {
        Duration::from_millis(self.summary_timeout_ms)
    }

    pub fn title_timeout(&self) -> Duration {
        Duration::from_millis(self.title_timeout_ms)
    }

    /// Delay before title attempt `attempt` (0-based): base × growth^attempt,
    /// capped at the max delay.
    pub fn title_delay(&self, attempt: u32) -> Duration {
        let factor = self.title_growth.max(1.0).powi(attempt.min(64) as i32);
        let ms = (self.title_base_delay_ms as f64 * factor).min(self.title_max_delay_ms as f64);
        Duration::from_millis(ms as u64)
    }
}
