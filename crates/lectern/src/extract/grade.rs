use regex::Regex;
use std::sync::LazyLock;

use super::numerals::{parse_number_word, parse_roman};

/// `Class 8`, `Grade: 10`, `Std. 7`, `Standard 9`
static GRADE_DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:class|grade|std\.?|standard)\s*[-:]?\s*(\d{1,2})\b").unwrap()
});

/// `8th Grade`, `10th class`, `2nd standard`
static GRADE_ORDINAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\s+(?:class|grade|std\.?|standard)\b").unwrap()
});

/// `Class VIII`, `Class XII`. Uppercase only, so `class i` in prose is ignored.
static GRADE_ROMAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:class|grade|standard)\s*[-:]?\s*([IVX]{1,4})\b").unwrap()
});

/// `Grade Ten`, `class seven`
static GRADE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:class|grade|standard)\s+(one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve)\b").unwrap()
});

const MIN_GRADE: u32 = 1;
const MAX_GRADE: u32 = 12;

fn in_range(n: u32) -> Option<u32> {
    (MIN_GRADE..=MAX_GRADE).contains(&n).then_some(n)
}

fn first_digits(re: &Regex, text: &str) -> Option<u32> {
    re.captures_iter(text)
        .find_map(|caps| caps[1].parse::<u32>().ok().and_then(in_range))
}

/// Extracts a school grade (1 to 12) from the leading text.
pub fn extract_grade(text: &str) -> Option<u32> {
    first_digits(&GRADE_DIGITS, text)
        .or_else(|| first_digits(&GRADE_ORDINAL, text))
        .or_else(|| {
            GRADE_ROMAN
                .captures_iter(text)
                .find_map(|caps| parse_roman(&caps[1]).and_then(in_range))
        })
        .or_else(|| {
            GRADE_WORD
                .captures_iter(text)
                .find_map(|caps| parse_number_word(&caps[1]).and_then(in_range))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_forms() {
        assert_eq!(extract_grade("Mathematics Class 8"), Some(8));
        assert_eq!(extract_grade("GRADE: 10 Physics"), Some(10));
        assert_eq!(extract_grade("Std. 7 Science"), Some(7));
    }

    #[test]
    fn test_ordinal_form() {
        assert_eq!(extract_grade("Textbook for 9th Grade students"), Some(9));
    }

    #[test]
    fn test_roman_form() {
        assert_eq!(extract_grade("Textbook in Mathematics for Class VIII"), Some(8));
        assert_eq!(extract_grade("Class XII"), Some(12));
    }

    #[test]
    fn test_word_form() {
        assert_eq!(extract_grade("Notes for grade ten"), Some(10));
    }

    #[test]
    fn test_out_of_range_is_skipped() {
        assert_eq!(extract_grade("Class 15 reunion"), None);
        assert_eq!(extract_grade("Class 15 then Class 6"), Some(6));
    }

    #[test]
    fn test_no_grade() {
        assert_eq!(extract_grade("A first course in linear algebra"), None);
        assert_eq!(extract_grade("this class is about physics"), None);
    }
}
