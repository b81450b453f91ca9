use serde::{Deserialize, Serialize};

use super::denylist::{is_denylisted, is_generic_subject};
use super::numerals::parse_any;
use super::strategies::{
    chapter_marker_parts, numbered_title, subsection_title, title_after_marker, HEAD_LINES,
};

/// Chapter number and label, either of which may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    pub number: Option<u32>,
    pub label: Option<String>,
}

impl ChapterInfo {
    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.label.is_none()
    }
}

const MAX_CHAPTER: u32 = 99;

fn accept_label(label: Option<String>) -> Option<String> {
    label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty() && !is_generic_subject(l) && !is_denylisted(l))
}

fn accept_number(n: u32) -> Option<u32> {
    (1..=MAX_CHAPTER).contains(&n).then_some(n)
}

/// Chapter extraction over pre-split lines.
///
/// Order: explicit `Chapter N` marker, then a numbered `<n> <TITLE>` line in
/// the first lines, then the major number of a `n.m` sub-section.
pub fn extract_chapter_from_lines(lines: &[&str]) -> ChapterInfo {
    for (idx, line) in lines.iter().enumerate() {
        if let Some((token, _)) = chapter_marker_parts(line) {
            let number = parse_any(&token).and_then(accept_number);
            let label = accept_label(title_after_marker(lines, idx));
            if number.is_some() || label.is_some() {
                return ChapterInfo { number, label };
            }
        }
    }

    for line in lines.iter().take(HEAD_LINES) {
        if let Some((n, title)) = numbered_title(line) {
            if let (Some(number), Some(label)) = (accept_number(n), accept_label(Some(title))) {
                return ChapterInfo {
                    number: Some(number),
                    label: Some(label),
                };
            }
        }
    }

    if let Some((major, title)) = subsection_title(lines) {
        return ChapterInfo {
            number: accept_number(major),
            label: accept_label(title),
        };
    }

    ChapterInfo::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(text: &str) -> ChapterInfo {
        let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        extract_chapter_from_lines(&lines)
    }

    #[test]
    fn test_numbered_line_in_head() {
        let info = chapter("MATHEMATICS\nClass VIII\n1 A SQUARE AND A CUBE\nQueen Rukhsana...");
        assert_eq!(info.number, Some(1));
        assert_eq!(info.label.as_deref(), Some("A SQUARE AND A CUBE"));
    }

    #[test]
    fn test_marker_with_roman_number() {
        let info = chapter("Chapter IV\nCARBON AND ITS COMPOUNDS");
        assert_eq!(info.number, Some(4));
        assert_eq!(info.label.as_deref(), Some("CARBON AND ITS COMPOUNDS"));
    }

    #[test]
    fn test_generic_subject_is_not_a_label() {
        let info = chapter("2 SCIENCE\nsome text");
        assert!(info.is_empty());
    }

    #[test]
    fn test_subsection_major_number() {
        let info = chapter("prose line\n5.2 Types of Triangles");
        assert_eq!(info.number, Some(5));
        assert_eq!(info.label, None);
    }

    #[test]
    fn test_nothing_found() {
        assert!(chapter("just some ordinary notes\nwith no structure").is_empty());
    }
}
