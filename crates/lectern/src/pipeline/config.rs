use std::time::Duration;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunk_chars: usize,
    pub extraction_timeout: Duration,
    pub transcript_timeout: Duration,
    pub ai_timeout: Duration,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_chars: config.extraction.chunk_chars,
            extraction_timeout: config.timeouts.extraction(),
            transcript_timeout: config.timeouts.transcript(),
            ai_timeout: config.timeouts.ai(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
