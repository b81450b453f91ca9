//! Prompt construction and response parsing.

use crate::extract::denylist::GENERIC_TITLES;

/// Escapes chat-template control sequences so document text cannot
/// impersonate a system or assistant turn.
pub fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("<s>", "< s >")
        .replace("</s>", "< / s >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
        .replace("<<SYS>>", "< < SYS > >")
        .replace("<</SYS>>", "< < / SYS > >")
}

pub const TITLE_SYSTEM: &str = "You name study material. Reply with JSON only: \
{\"title\": \"<title>\"}. The title must be the specific chapter or document title \
as printed in the text. Never answer with a school subject (Mathematics, Science, \
History, ...), a section heading (Introduction, Exercise, Summary, ...), a file name, \
or a placeholder.";

pub fn title_user_prompt(first_page: &str) -> String {
    format!(
        "Forbidden answers: {}.\n\nFirst page:\n\"\"\"\n{}\n\"\"\"",
        GENERIC_TITLES.join(", "),
        sanitize_for_prompt(first_page)
    )
}

pub const SUMMARY_SYSTEM: &str = "You summarize study material for a student. \
Write a concise summary of the key ideas in plain prose, at most three short paragraphs. \
Do not invent content that is not in the text.";

pub fn summary_user_prompt(text: &str) -> String {
    format!("Material:\n\"\"\"\n{}\n\"\"\"", sanitize_for_prompt(text))
}

/// Returns the first balanced `{...}` object in `response`, skipping braces
/// inside string literals. Returns the input unchanged if there is none.
pub fn extract_json(response: &str) -> &str {
    let Some(start) = response.find('{') else {
        return response;
    };

    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut end = response.len();

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    &response[start..end]
}

#[derive(serde::Deserialize)]
struct TitleReply {
    title: Option<String>,
}

/// Pulls the title out of a model reply: the `title` field of a JSON
/// object if present, otherwise the first non-empty line, unquoted.
pub fn parse_title_reply(response: &str) -> Option<String> {
    if let Ok(reply) = serde_json::from_str::<TitleReply>(extract_json(response)) {
        return reply
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
    }

    response
        .lines()
        .map(|l| l.trim().trim_matches('"').trim())
        .find(|l| !l.is_empty() && !l.starts_with('{'))
        .map(str::to_string)
}
