use lopdf::{Document, Object};

use super::ExtractError;

/// Text pulled from a PDF, one entry per extracted page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfText {
    pub pages: Vec<String>,
    /// Number of pages in the document, extracted or not.
    pub page_count: usize,
    /// `Title` from the document information dictionary.
    pub info_title: Option<String>,
}

impl PdfText {
    pub fn first_page(&self) -> &str {
        self.pages.first().map(String::as_str).unwrap_or("")
    }
}

/// Extracts only the first page. Used by the ingestion fast path.
pub fn extract_first_page(bytes: &[u8]) -> Result<PdfText, ExtractError> {
    let _span = tracing::info_span!("processor.pdf.first_page", bytes = bytes.len()).entered();
    extract(bytes, Some(1))
}

/// Extracts every page.
pub fn extract_full(bytes: &[u8]) -> Result<PdfText, ExtractError> {
    let _span = tracing::info_span!("processor.pdf.full", bytes = bytes.len()).entered();
    extract(bytes, None)
}

fn extract(bytes: &[u8], max_pages: Option<usize>) -> Result<PdfText, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Load(e.to_string()))?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ExtractError::NoPages);
    }

    let limit = max_pages.unwrap_or(usize::MAX);
    let mut texts = Vec::new();
    for (&page_num, _) in pages.iter().take(limit) {
        match doc.extract_text(&[page_num]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                // One bad content stream should not lose the rest of the document
                tracing::debug!(page = page_num, error = %e, "Skipping unreadable page");
                texts.push(String::new());
            }
        }
    }

    Ok(PdfText {
        pages: texts,
        page_count: pages.len(),
        info_title: info_title(&doc),
    })
}

/// Reads `/Info /Title` from the trailer, if present and non-empty.
fn info_title(doc: &Document) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let info = match info {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let title = info.as_dict().ok()?.get(b"Title").ok()?;
    let title = match title {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match title {
        Object::String(raw, _) => {
            let decoded = decode_text_string(raw);
            let trimmed = decoded.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE with a BOM, otherwise treated as
/// single-byte (PDFDocEncoding agrees with Latin-1 for printable text).
fn decode_text_string(raw: &[u8]) -> String {
    if let Some(body) = raw.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    raw.iter().map(|&b| b as char).collect()
}

/// Concatenates page texts, returning the joined text and the byte offset
/// at which each page starts.
pub fn join_pages(pages: &[String]) -> (String, Vec<usize>) {
    let mut text = String::new();
    let mut starts = Vec::with_capacity(pages.len());
    for page in pages {
        starts.push(text.len());
        text.push_str(page);
        if !page.ends_with('\n') {
            text.push('\n');
        }
    }
    (text, starts)
}

/// Marker lopdf emits for CID fonts it cannot decode.
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

/// Below this many characters the alphanumeric ratio is not checked.
const MIN_TOTAL_CHARS: usize = 50;

/// Text under this share of alphanumerics is treated as garbled.
const MIN_ALPHANUMERIC_PERCENT: usize = 10;

/// Returns false for text that is empty, only font-decoding markers, or
/// mostly symbols. Such output means a scanned or badly encoded PDF.
pub fn is_usable_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    let cleaned = trimmed
        .replace(IDENTITY_H_PATTERN, "")
        .replace(['\n', ' '], "");
    if cleaned.is_empty() {
        return false;
    }

    let total_chars = trimmed.chars().count();
    let alphanumeric_chars = trimmed.chars().filter(|c| c.is_alphanumeric()).count();

    !(total_chars > MIN_TOTAL_CHARS
        && alphanumeric_chars * 100 < total_chars * MIN_ALPHANUMERIC_PERCENT)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Builds a PDF with one page per entry in `pages`.
    pub(crate) fn build_pdf(pages: &[&str], title: Option<&str>) -> Vec<u8> {
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
            // One text object per line so extraction keeps the line breaks.
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

        if let Some(title) = title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_first_page_only() {
        let bytes = build_pdf(&["Page one", "Page two", "Page three"], None);

        let first = extract_first_page(&bytes).unwrap();
        assert_eq!(first.pages.len(), 1);
        assert_eq!(first.page_count, 3);

        let full = extract_full(&bytes).unwrap();
        assert_eq!(full.pages.len(), 3);
    }

    #[test]
    fn test_info_title() {
        let bytes = build_pdf(&["Body"], Some("Linear Equations"));
        let text = extract_first_page(&bytes).unwrap();
        assert_eq!(text.info_title.as_deref(), Some("Linear Equations"));

        let bytes = build_pdf(&["Body"], None);
        assert!(extract_full(&bytes).unwrap().info_title.is_none());
    }

    #[test]
    fn test_corrupted_pdf() {
        let err = extract_full(b"not a valid pdf content").unwrap_err();
        assert!(matches!(err, ExtractError::Load(_)));
    }

    #[test]
    fn test_decode_utf16_title() {
        let raw = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_text_string(&raw), "Hi");
        assert_eq!(decode_text_string(b"Plain"), "Plain");
    }

    #[test]
    fn test_join_pages_offsets() {
        let pages = vec!["abc".to_string(), "de\n".to_string(), "f".to_string()];
        let (text, starts) = join_pages(&pages);
        assert_eq!(text, "abc\nde\nf\n");
        assert_eq!(starts, vec![0, 4, 7]);
    }

    #[test]
    fn test_usable_text() {
        assert!(!is_usable_text(""));
        assert!(!is_usable_text("  \n\t "));
        assert!(!is_usable_text(
            "?Identity-H Unimplemented?\n\n?Identity-H Unimplemented?"
        ));
        assert!(is_usable_text("Chapter 1 Real Numbers"));
        assert!(is_usable_text("Invoice #123 ?Identity-H Unimplemented? Total: $500"));

        let garbled = "!@#$%^&*(){}[]|\\:\";<>?,./~`!@#$%^&*(){}[]|\\:\";<>?,./~`!!";
        assert!(garbled.chars().count() > MIN_TOTAL_CHARS);
        assert!(!is_usable_text(garbled));

        // Exactly at the threshold the ratio check does not apply
        assert!(is_usable_text(&"!".repeat(MIN_TOTAL_CHARS)));
        assert!(!is_usable_text(&"!".repeat(MIN_TOTAL_CHARS + 1)));
    }
}
