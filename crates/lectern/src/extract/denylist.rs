//! Words and titles that never count as a real document title.

use regex::Regex;
use std::sync::LazyLock;

/// Section markers and boilerplate headings found in textbooks and papers.
const COMMON_WORDS: &[&str] = &[
    "ABSTRACT",
    "ACKNOWLEDGEMENTS",
    "ACKNOWLEDGMENTS",
    "ACTIVITY",
    "ANSWERS",
    "APPENDIX",
    "BIBLIOGRAPHY",
    "CHAPTER",
    "CONCLUSION",
    "CONCLUSIONS",
    "CONTENTS",
    "EXAMPLE",
    "EXAMPLES",
    "EXERCISE",
    "EXERCISES",
    "FIGURE",
    "FOREWORD",
    "GLOSSARY",
    "INDEX",
    "INTRODUCTION",
    "KEY POINTS",
    "LEARNING OBJECTIVES",
    "LESSON",
    "NOTES",
    "OVERVIEW",
    "PAGE",
    "PART",
    "PREFACE",
    "REFERENCES",
    "SECTION",
    "SUMMARY",
    "TABLE",
    "TABLE OF CONTENTS",
    "THINK AND DISCUSS",
    "UNIT",
    "WHAT YOU HAVE LEARNT",
];

/// Subject names that label a whole book rather than a chapter.
const GENERIC_SUBJECTS: &[&str] = &[
    "ACCOUNTANCY",
    "BIOLOGY",
    "BUSINESS STUDIES",
    "CHEMISTRY",
    "CIVICS",
    "COMPUTER SCIENCE",
    "ECONOMICS",
    "ENGLISH",
    "GEOGRAPHY",
    "HINDI",
    "HISTORY",
    "MATH",
    "MATHEMATICS",
    "MATHS",
    "PHYSICS",
    "POLITICAL SCIENCE",
    "SANSKRIT",
    "SCIENCE",
    "SOCIAL SCIENCE",
    "TEXT BOOK",
    "TEXTBOOK",
];

/// Placeholder titles shown while nothing better is known.
pub const GENERIC_TITLES: &[&str] = &[
    "Untitled",
    "Untitled Document",
    "Document",
    "PDF Document",
    "YouTube Video",
    "Text Note",
    "Pasted Text",
    "New Content",
    "Processing...",
    "Loading...",
];

pub const FALLBACK_PDF_TITLE: &str = "PDF Document";
pub const FALLBACK_YOUTUBE_TITLE: &str = "YouTube Video";
pub const FALLBACK_TEXT_TITLE: &str = "Text Note";

/// Leading numeric (`1.`, `2.1`, `3)`) or punctuated Roman (`IV.`, `ii)`) prefix.
static SECTION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+(?:\.\d+)*[.):\-]?|(?i:[ivxlcdm]+)[.):])\s+").unwrap()
});

/// `CHAPTER 3`, `Unit IV`, `Section B`: a bare marker with no title.
static BARE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:chapter|unit|lesson|part|section|page|figure|fig\.|table)(?:\s*[\d.]+|\s+[ivxlcdm]+\.?|\s+[a-z])?$")
        .unwrap()
});

static FILE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(?:pdf|docx?|txt|md|pptx?|epub|rtf|odt)$").unwrap()
});

/// Removes one leading section-number prefix: `"1. INTRODUCTION"` → `"INTRODUCTION"`.
pub fn strip_section_prefix(s: &str) -> &str {
    match SECTION_PREFIX.find(s) {
        Some(m) => &s[m.end()..],
        None => s.trim_start(),
    }
}

pub fn has_section_prefix(s: &str) -> bool {
    SECTION_PREFIX.is_match(s)
}

fn normalize(s: &str) -> String {
    strip_section_prefix(s)
        .trim()
        .trim_end_matches([':', '.', ';', ',', '-'])
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// True if the candidate is a common heading word, a generic subject name
/// or a bare chapter marker, ignoring case and any numeric/Roman prefix.
pub fn is_denylisted(candidate: &str) -> bool {
    let normalized = normalize(candidate);
    if normalized.is_empty() {
        return true;
    }
    COMMON_WORDS.contains(&normalized.as_str())
        || GENERIC_SUBJECTS.contains(&normalized.as_str())
        || BARE_MARKER.is_match(&normalized)
}

/// True if the candidate names a school subject ("Mathematics", "2. SCIENCE").
pub fn is_generic_subject(candidate: &str) -> bool {
    GENERIC_SUBJECTS.contains(&normalize(candidate).as_str())
}

/// True for empty titles and the known placeholder titles.
pub fn is_generic_title(title: &str) -> bool {
    let title = title.trim();
    title.is_empty() || GENERIC_TITLES.iter().any(|g| g.eq_ignore_ascii_case(title))
}

/// True for titles that look like a section heading rather than a document
/// title: number/Roman-prefixed lines and denylisted words.
pub fn looks_like_section_heading(title: &str) -> bool {
    has_section_prefix(title) || is_denylisted(title)
}

/// True if the title should be replaced when something better turns up.
pub fn is_suspicious_title(title: &str) -> bool {
    is_generic_title(title) || looks_like_section_heading(title)
}

/// Turns a path- or filename-like candidate into its readable tail:
/// `"uploads/ws1/Linear Algebra.pdf"` → `"Linear Algebra"`.
pub fn clean_path_like(candidate: &str) -> String {
    let tail = candidate
        .trim()
        .rsplit(['/', '\\'])
        .find(|part| !part.trim().is_empty())
        .unwrap_or("");
    let without_ext = FILE_EXTENSION.replace(tail, "");
    without_ext
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn looks_like_path(candidate: &str) -> bool {
    candidate.contains('/') || candidate.contains('\\') || FILE_EXTENSION.is_match(candidate.trim())
}
