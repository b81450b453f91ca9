//! Title heuristics, strongest signal first.
//!
//! Each strategy is a pure function over the leading lines of a document.
//! [`super::extract_title`] runs them in [`TitleStrategy::ALL`] order and
//! keeps the first candidate that survives cleaning and the denylist.

use regex::Regex;
use std::sync::LazyLock;

use super::denylist::{has_section_prefix, is_denylisted, strip_section_prefix};

/// Lines scanned by strategies that only look near the top of a document.
pub const HEAD_LINES: usize = 20;

/// Lines above a numbered sub-section searched for its chapter title.
const CONTEXT_WINDOW: usize = 8;

const CONNECTIVES: &[&str] = &["AND", "OF", "THE", "FOR", "USING", "WITH"];

/// Lowercase words that do not break Title Case.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "into", "of", "on", "or", "the",
    "to", "using", "via", "with",
];

static NUMBERED_LEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[.:)]?\s+([A-Za-z][A-Za-z0-9 ,'&:\-]*[A-Za-z])$").unwrap()
});

static NUMBERED_TRAILING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z ,'&:\-]*[A-Za-z])\s+(\d{1,2})$").unwrap()
});

static SUBSECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\.(\d{1,2})(?:\.\d{1,2})?\.?\s+\S").unwrap());

pub(crate) static CHAPTER_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:chapter|unit|lesson)\s+(\d{1,2}|[ivxlcdm]{1,6}|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)\b[\s.:\-]*(.*)$",
    )
    .unwrap()
});

static PAPER_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:abstract|introduction)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStrategy {
    /// Long Title-Case line before the abstract/introduction.
    ResearchPaper,
    /// Mostly-uppercase line containing a connective word.
    UppercaseConnective,
    /// `<number> <TITLE>` or `<TITLE> <number>`.
    NumberedChapter,
    /// Short uppercase line just above a `2.1 ...` sub-section.
    SubsectionContext,
    /// Text following an explicit `Chapter N` marker.
    ChapterMarker,
    /// Longest uppercase line, then any Title-Case line.
    Fallback,
}

impl TitleStrategy {
    pub const ALL: [TitleStrategy; 6] = [
        TitleStrategy::ResearchPaper,
        TitleStrategy::UppercaseConnective,
        TitleStrategy::NumberedChapter,
        TitleStrategy::SubsectionContext,
        TitleStrategy::ChapterMarker,
        TitleStrategy::Fallback,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TitleStrategy::ResearchPaper => "research_paper",
            TitleStrategy::UppercaseConnective => "uppercase_connective",
            TitleStrategy::NumberedChapter => "numbered_chapter",
            TitleStrategy::SubsectionContext => "subsection_context",
            TitleStrategy::ChapterMarker => "chapter_marker",
            TitleStrategy::Fallback => "fallback",
        }
    }

    /// Proposes a raw candidate. Cleaning and the final denylist check
    /// happen in the caller.
    pub fn apply(&self, lines: &[&str]) -> Option<String> {
        match self {
            TitleStrategy::ResearchPaper => research_paper(lines),
            TitleStrategy::UppercaseConnective => uppercase_connective(lines),
            TitleStrategy::NumberedChapter => numbered_chapter(lines),
            TitleStrategy::SubsectionContext => subsection_context(lines),
            TitleStrategy::ChapterMarker => chapter_marker(lines),
            TitleStrategy::Fallback => fallback(lines),
        }
    }
}

/// Fraction of ASCII letters that are uppercase; 0.0 when there are none.
pub fn uppercase_ratio(s: &str) -> f64 {
    let (upper, letters) = s
        .chars()
        .filter(|c| c.is_alphabetic())
        .fold((0usize, 0usize), |(u, n), c| {
            (u + usize::from(c.is_uppercase()), n + 1)
        });
    if letters == 0 {
        0.0
    } else {
        upper as f64 / letters as f64
    }
}

pub fn is_mostly_uppercase(s: &str) -> bool {
    uppercase_ratio(s) >= 0.8
}

fn word_count(s: &str) -> usize {
    s.split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_alphabetic()))
        .count()
}

/// At least 70% of significant words start with an uppercase letter.
pub fn is_title_case(s: &str) -> bool {
    let words: Vec<&str> = s
        .split_whitespace()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_alphabetic()))
        .collect();
    if words.is_empty() {
        return false;
    }
    let significant: Vec<&&str> = words
        .iter()
        .filter(|w| !MINOR_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    if significant.is_empty() {
        return false;
    }
    let capitalized = significant
        .iter()
        .filter(|w| w.chars().next().is_some_and(|c| c.is_uppercase()))
        .count();
    capitalized * 10 >= significant.len() * 7
}

fn has_connective(s: &str) -> bool {
    s.split_whitespace().any(|w| {
        let w = w.trim_matches(|c: char| !c.is_alphanumeric());
        CONNECTIVES.contains(&w)
    })
}

/// Prose and boilerplate lines that are never titles.
fn is_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    line.contains('@')
        || lower.contains("http")
        || lower.contains("www.")
        || lower.contains("isbn")
        || lower.contains('©')
        || lower.contains("copyright")
        || line.ends_with('.')
        || line.chars().filter(|c| c.is_ascii_digit()).count() * 3 > line.chars().count()
}

fn is_subsection(line: &str) -> bool {
    SUBSECTION.is_match(line)
}

fn research_paper(lines: &[&str]) -> Option<String> {
    let marker = lines
        .iter()
        .position(|l| PAPER_MARKER.is_match(strip_section_prefix(l)));
    let end = marker.unwrap_or(HEAD_LINES).min(HEAD_LINES).min(lines.len());

    lines[..end]
        .iter()
        .find(|l| {
            l.chars().count() >= 30
                && word_count(l) >= 5
                && !is_mostly_uppercase(l)
                && is_title_case(l)
                && !is_noise(l)
                && !has_section_prefix(l)
        })
        .map(|l| l.to_string())
}

fn uppercase_connective(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .find(|l| {
            word_count(l) >= 2
                && l.chars().count() <= 120
                && is_mostly_uppercase(l)
                && has_connective(l)
                && !is_subsection(l)
                && !is_noise(l)
                && !is_denylisted(l)
        })
        .map(|l| l.to_string())
}

/// Parses `1 A SQUARE AND A CUBE` or `MOTION 3` into (number, title).
pub fn numbered_title(line: &str) -> Option<(u32, String)> {
    let (number, title) = if let Some(caps) = NUMBERED_LEADING.captures(line) {
        (caps[1].parse().ok()?, caps[2].trim().to_string())
    } else if let Some(caps) = NUMBERED_TRAILING.captures(line) {
        (caps[2].parse().ok()?, caps[1].trim().to_string())
    } else {
        return None;
    };

    let shaped = is_mostly_uppercase(&title) || is_title_case(&title);
    if number == 0 || title.chars().count() < 3 || !shaped || is_denylisted(&title) {
        return None;
    }
    Some((number, title))
}

fn numbered_chapter(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(HEAD_LINES)
        .filter(|l| !is_noise(l))
        .find_map(|l| numbered_title(l))
        .map(|(_, title)| title)
}

/// Finds the short uppercase line nearest above the first usable
/// numbered sub-section. Returns the sub-section's major number too.
pub fn subsection_title(lines: &[&str]) -> Option<(u32, Option<String>)> {
    let (idx, major) = lines.iter().enumerate().find_map(|(i, l)| {
        SUBSECTION
            .captures(l)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .map(|major| (i, major))
    })?;

    let start = idx.saturating_sub(CONTEXT_WINDOW);
    let title = lines[start..idx]
        .iter()
        .rev()
        .find(|l| {
            l.chars().count() <= 80
                && (1..=10).contains(&word_count(l))
                && l.chars().filter(|c| c.is_alphabetic()).count() >= 3
                && is_mostly_uppercase(l)
                && !is_subsection(l)
                && !is_noise(l)
                && !is_denylisted(l)
        })
        .map(|l| l.to_string());

    Some((major, title))
}

fn subsection_context(lines: &[&str]) -> Option<String> {
    subsection_title(lines).and_then(|(_, title)| title)
}

/// Splits a `Chapter N: Title` line into the number token and the rest.
pub fn chapter_marker_parts(line: &str) -> Option<(String, String)> {
    CHAPTER_MARKER
        .captures(line)
        .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
}

/// Title for a chapter marker found at `idx`: the text after the marker on
/// the same line, else the next non-generic line, joined with a second
/// uppercase line when the title wraps.
pub fn title_after_marker(lines: &[&str], idx: usize) -> Option<String> {
    let (_, rest) = chapter_marker_parts(lines.get(idx)?)?;
    if !rest.is_empty() && !is_denylisted(&rest) && !is_noise(&rest) {
        return Some(rest);
    }

    let following = lines.get(idx + 1..)?;
    let (offset, first) = following
        .iter()
        .take(3)
        .enumerate()
        .find(|(_, l)| !is_denylisted(l) && !is_noise(l) && word_count(l) >= 1)?;

    let mut title = first.to_string();
    if let Some(next) = following.get(offset + 1) {
        let wraps = is_mostly_uppercase(first)
            && is_mostly_uppercase(next)
            && title.chars().count() + next.chars().count() <= 80
            && !is_denylisted(next)
            && !is_subsection(next)
            && !has_section_prefix(next);
        if wraps {
            title.push(' ');
            title.push_str(next);
        }
    }
    Some(title)
}

fn chapter_marker(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, l)| CHAPTER_MARKER.is_match(l))
        .find_map(|(i, _)| title_after_marker(lines, i))
}

fn fallback(lines: &[&str]) -> Option<String> {
    let eligible = |l: &&&str| !is_noise(l) && !is_denylisted(l) && !is_subsection(l);

    let uppercase = lines
        .iter()
        .filter(eligible)
        .filter(|l| word_count(l) >= 2 && l.chars().count() <= 120 && is_mostly_uppercase(l))
        // max_by_key keeps the last maximum; reverse so the earliest longest wins
        .rev()
        .max_by_key(|l| l.chars().count());
    if let Some(line) = uppercase {
        return Some(line.to_string());
    }

    lines
        .iter()
        .take(HEAD_LINES)
        .filter(eligible)
        .find(|l| word_count(l) >= 2 && l.chars().count() >= 8 && is_title_case(l))
        .map(|l| l.to_string())
}
