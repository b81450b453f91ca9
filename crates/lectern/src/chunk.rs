//! Splits extracted text into contiguous chunks.
//!
//! Chunks are exact slices of the input: concatenating chunk texts in index
//! order reproduces the input byte for byte.

use crate::content::Chunk;

/// A timed transcript line.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptSegment {
    /// Start offset in seconds.
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
    pub text: String,
}

/// Joins segment texts with newlines; the canonical transcript string.
pub fn transcript_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Chunks plain text, preferring paragraph, then line, then word breaks.
    pub fn chunk_text(&self, text: &str) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(index, (_, slice))| Chunk {
                text: slice.to_string(),
                index,
                page: None,
                timestamp: None,
            })
            .collect()
    }

    /// Chunks text built from pages, tagging each chunk with the 1-based page
    /// its first byte falls on. `page_starts` are ascending byte offsets.
    pub fn chunk_pages(&self, text: &str, page_starts: &[usize]) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .enumerate()
            .map(|(index, (offset, slice))| {
                let page = page_starts.partition_point(|&start| start <= offset);
                Chunk {
                    text: slice.to_string(),
                    index,
                    page: u32::try_from(page).ok().filter(|p| *p > 0),
                    timestamp: None,
                }
            })
            .collect()
    }

    /// Groups transcript lines into chunks without splitting a line. Each
    /// chunk carries the start time of its first line. The chunk texts
    /// concatenate to [`transcript_text`].
    pub fn chunk_transcript(&self, segments: &[TranscriptSegment]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_start: Option<f64> = None;
        let last = segments.len().saturating_sub(1);

        for (i, segment) in segments.iter().enumerate() {
            let mut line = segment.text.trim().to_string();
            if i != last {
                line.push('\n');
            }

            if !current.is_empty() && current.chars().count() + line.chars().count() > self.max_chars
            {
                chunks.push(Chunk {
                    text: std::mem::take(&mut current),
                    index: chunks.len(),
                    page: None,
                    timestamp: current_start.take(),
                });
            }

            if current.is_empty() {
                current_start = Some(segment.start);
            }
            current.push_str(&line);
        }

        if !current.is_empty() {
            chunks.push(Chunk {
                text: current,
                index: chunks.len(),
                page: None,
                timestamp: current_start,
            });
        }
        chunks
    }

    /// Returns `(byte_offset, slice)` pairs covering `text` exactly.
    fn split<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut out = Vec::new();
        let mut offset = 0;

        while offset < text.len() {
            let rest = &text[offset..];
            let end = self.cut_point(rest);
            out.push((offset, &rest[..end]));
            offset += end;
        }
        out
    }

    /// Byte length of the next chunk taken from the front of `rest`.
    fn cut_point(&self, rest: &str) -> usize {
        let Some((limit, _)) = rest.char_indices().nth(self.max_chars) else {
            return rest.len();
        };
        let window = &rest[..limit];
        // Breaks in the first half would make chunks too small.
        let min = window.len() / 2;

        for sep in ["\n\n", "\n", " "] {
            if let Some(pos) = window.rfind(sep) {
                let cut = pos + sep.len();
                if cut > min {
                    return cut;
                }
            }
        }
        limit
    }
}
