//! Helpers for cleaning text before persistence and data before it enters
//! tracing span attributes.
//!
//! The record store rejects NUL bytes and most control characters, and
//! traces are shared for debugging, so no API keys may leak into spans.

use std::path::Path;

use url::Url;

/// Strips NUL bytes and control characters from extracted text.
///
/// Newlines and tabs survive; `\r\n` and lone `\r` become `\n`.
pub fn strip_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            '\n' | '\t' => out.push(c),
            // U+FFFD is what lossy decoders leave behind for invalid bytes
            '\u{FFFD}' => {}
            c if c.is_control() => {}
            c => out.push(c),
        }
    }

    out
}

/// Returns only the filename component of a path or blob key.
///
/// Safe for span fields: reveals file name without exposing the full path.
pub fn redact_path<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks credential-looking query parameters in a URL.
///
/// - `https://api/videos?id=x&key=SECRET` → `https://api/videos?id=x&key=****`
/// - `https://youtu.be/abc` → unchanged
///
/// Input that does not parse as a URL is replaced entirely.
pub fn redact_url(raw: &str) -> String {
    const SECRET_PARAMS: &[&str] = &["key", "api_key", "apikey", "token", "access_token"];

    let Ok(mut url) = Url::parse(raw) else {
        return "<unparseable url>".to_string();
    };
    if url.query().is_none() {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str()) {
                "****".to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}

/// Truncates to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
