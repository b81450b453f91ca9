//! Builders for test inputs and mocked upstream replies.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TITLE_MODEL: &str = "title-model";
pub const SUMMARY_MODEL: &str = "summary-model";

/// Builds a PDF with one page per entry, one text line per line of input.
pub fn build_pdf(pages: &[&str], info_title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = text
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let escaped = line
                    .replace('\\', "\\\\")
                    .replace('(', "\\(")
                    .replace(')', "\\)");
                format!("BT /F1 12 Tf 50 {} Td ({}) Tj ET", 740 - 14 * i as i64, escaped)
            })
            .collect::<Vec<_>>()
            .join("\n");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = info_title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
    bytes
}

const BOUNDARY: &str = "lectern-test-boundary";

/// Builder for `multipart/form-data` request bodies.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Returns the `Content-Type` header value and the body.
    pub fn build(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.body)
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

/// Answers title-refinement calls with `title`.
pub async fn mount_title_reply(server: &MockServer, title: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": TITLE_MODEL })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(&json!({ "title": title }).to_string())),
        )
        .mount(server)
        .await;
}

/// Answers summarization calls with `summary`.
pub async fn mount_summary_reply(server: &MockServer, summary: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({ "model": SUMMARY_MODEL })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(summary)))
        .mount(server)
        .await;
}

pub async fn mount_oembed(server: &MockServer, title: &str, channel: &str) {
    Mock::given(method("GET"))
        .and(path("/oembed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": title,
            "author_name": channel,
            "thumbnail_url": "https://i.ytimg.com/vi/x/hqdefault.jpg"
        })))
        .mount(server)
        .await;
}

pub async fn mount_transcript(server: &MockServer, video_id: &str, lines: &[&str]) {
    let segments: Vec<serde_json::Value> = lines
        .iter()
        .enumerate()
        .map(|(i, text)| json!({ "start": i as f64 * 5.0, "duration": 5.0, "text": text }))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/transcripts/{}", video_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "segments": segments })))
        .mount(server)
        .await;
}
