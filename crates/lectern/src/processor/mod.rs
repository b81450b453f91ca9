//! Document text extraction.

pub mod pdf;

pub use pdf::{extract_first_page, extract_full, is_usable_text, join_pages, PdfText};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("PDF has no pages")]
    NoPages,

    #[error("Extraction task failed: {0}")]
    Task(String),
}
