//! Background processing of content records after ingestion.

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod runner;

pub use classify::Classification;
pub use config::PipelineConfig;
pub use context::{PipelineContext, PipelineReport};
pub use error::{PipelineError, PipelineWarning};
pub use runner::Pipeline;

pub(crate) use runner::bounded;
