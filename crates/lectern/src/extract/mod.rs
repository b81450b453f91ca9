//! Heuristic title, chapter and grade extraction.
//!
//! Everything here is pure and deterministic. Inputs are bounded to the
//! first [`SCAN_CHARS`] characters so the gateway's fast path stays cheap.

pub mod chapter;
pub mod denylist;
pub mod grade;
pub mod numerals;
pub mod strategies;

use serde_json::json;

pub use chapter::ChapterInfo;
pub use denylist::{
    clean_path_like, is_denylisted, is_generic_title, is_suspicious_title,
    looks_like_section_heading, strip_section_prefix, GENERIC_TITLES,
};
pub use strategies::TitleStrategy;

use crate::content::{keys, Metadata};
use crate::sanitize::truncate_chars;

/// Characters of leading text the heuristics look at.
pub const SCAN_CHARS: usize = 4000;

const MAX_TITLE_CHARS: usize = 200;

fn head_lines(text: &str) -> Vec<&str> {
    truncate_chars(text, SCAN_CHARS)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Normalizes a raw candidate, or rejects it.
///
/// Path-like candidates are reduced to their readable tail instead of being
/// dropped; a leading section number is removed.
pub fn clean_candidate(raw: &str) -> Option<String> {
    let raw = if denylist::looks_like_path(raw) {
        clean_path_like(raw)
    } else {
        raw.to_string()
    };

    let cleaned = strip_section_prefix(&raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let cleaned = cleaned
        .trim_matches(|c: char| c == ':' || c == '-' || c == ',' || c == ';')
        .trim();

    if cleaned.chars().count() < 3
        || !cleaned.chars().any(|c| c.is_alphabetic())
        || is_denylisted(cleaned)
        || is_generic_title(cleaned)
    {
        return None;
    }
    Some(truncate_chars(cleaned, MAX_TITLE_CHARS).trim_end().to_string())
}

/// Runs the strategy chain and returns the first surviving candidate along
/// with the strategy that produced it.
pub fn extract_title_with_strategy(text: &str) -> Option<(String, TitleStrategy)> {
    let lines = head_lines(text);
    TitleStrategy::ALL.iter().find_map(|strategy| {
        strategy
            .apply(&lines)
            .and_then(|raw| clean_candidate(&raw))
            .map(|title| (title, *strategy))
    })
}

pub fn extract_title(text: &str) -> Option<String> {
    extract_title_with_strategy(text).map(|(title, _)| title)
}

pub fn extract_chapter(text: &str) -> ChapterInfo {
    let lines = head_lines(text);
    let mut info = chapter::extract_chapter_from_lines(&lines);
    info.label = info.label.and_then(|l| clean_candidate(&l));
    info
}

pub fn extract_grade(text: &str) -> Option<u32> {
    grade::extract_grade(truncate_chars(text, SCAN_CHARS))
}

/// Combined result of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedMetadata {
    pub title: Option<String>,
    pub chapter: ChapterInfo,
    pub grade: Option<u32>,
}

impl ExtractedMetadata {
    /// Best title: the heuristic title, else the chapter label.
    pub fn best_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.chapter.label.as_deref())
    }

    /// Metadata bag entries for the fields that were found. Absent fields
    /// produce no key, so merging the patch never erases earlier findings.
    pub fn to_metadata_patch(&self, source: &str) -> Metadata {
        let mut patch = Metadata::new();
        if let Some(title) = self.best_title() {
            patch.insert(keys::DISPLAY_TITLE.into(), json!(title));
        }
        if let Some(label) = &self.chapter.label {
            patch.insert(keys::CHAPTER.into(), json!(label));
        }
        if let Some(number) = self.chapter.number {
            patch.insert(keys::CHAPTER_NUMBER.into(), json!(number));
        }
        if let Some(grade) = self.grade {
            patch.insert(keys::GRADE.into(), json!(grade));
        }
        patch.insert(keys::SOURCE.into(), json!(source));
        patch
    }
}

pub fn extract_metadata(text: &str) -> ExtractedMetadata {
    ExtractedMetadata {
        title: extract_title(text),
        chapter: extract_chapter(text),
        grade: extract_grade(text),
    }
}
