//! Overlapping text chunking for embedding storage.

use assay_core::DocumentPage;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_OVERLAP: usize = 200;

/// One chunk of document text with its position in the full text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub chunk_index: u32,
    /// Character offset of the chunk start within the full text.
    pub start_char: usize,
    pub text: String,
}

/// Split text into overlapping chunks of at most `chunk_size` characters.
///
/// Offsets are measured in characters, not bytes, so multi-byte text chunks
/// cleanly. Whitespace-only chunks are dropped. `overlap` must be smaller
/// than `chunk_size`; callers passing a degenerate overlap get it clamped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<TextChunk> {
    if text.trim().is_empty() || chunk_size == 0 {
        return Vec::new();
    }
    let overlap = overlap.min(chunk_size.saturating_sub(1));
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut index = 0u32;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let body: String = chars[start..end].iter().collect();
        if !body.trim().is_empty() {
            chunks.push(TextChunk {
                chunk_index: index,
                start_char: start,
                text: body,
            });
            index += 1;
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Estimate which page a character offset in the full text falls on.
///
/// Pages were joined into the full text in order, so the cumulative page
/// lengths locate the offset. Falls back to the last page for offsets past
/// the end.
pub fn estimate_page_number(start_char: usize, pages: &[DocumentPage]) -> u32 {
    let mut cumulative = 0usize;
    for page in pages {
        cumulative += page.text.chars().count();
        if start_char < cumulative {
            return page.page_number;
        }
    }
    pages.last().map(|p| p.page_number).unwrap_or(1)
}
