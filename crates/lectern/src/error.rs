use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LecternError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to resolve secret for '{name}': {source}")]
    Secret {
        name: String,
        #[source]
        source: crate::secrets::SecretError,
    },
}

/// Errors surfaced synchronously by the ingestion gateway.
#[derive(Error, Debug)]
pub enum IngestError {
    /// A required per-type field is missing or malformed (HTTP 4xx).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The fast-path extraction could not read anything usable.
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("Blob storage failed: {0}")]
    Storage(#[from] StorageError),

    /// Creating the content record failed; fatal for the request (HTTP 500).
    #[error("Persistence failed: {0}")]
    Persistence(#[from] crate::db::DatabaseError),

    #[error("Failed to schedule background work: {0}")]
    Scheduling(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid blob key '{0}'")]
    InvalidKey(String),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Blob task failed: {0}")]
    Task(String),
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker pool is shut down")]
    ShutDown,

    #[error("Job store error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

pub type Result<T> = std::result::Result<T, LecternError>;
