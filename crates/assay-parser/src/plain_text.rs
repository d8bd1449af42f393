//! Deterministic plain-text parser.
//!
//! Splits the input on form-feed characters into pages and takes the first
//! non-empty line as the document title. Used for text uploads and as the
//! deterministic parser in tests; PDF byte extraction plugs in behind the
//! same trait.

use assay_core::{DocumentMetadata, DocumentPage, ParsedDocument, StageError, StageResult};
use async_trait::async_trait;

/// Parses UTF-8 text into a `ParsedDocument`, one page per form-feed section.
#[derive(Debug, Default, Clone)]
pub struct PlainTextParser;

impl PlainTextParser {
    pub fn new() -> Self {
        PlainTextParser
    }
}

#[async_trait]
impl assay_core::DocumentParser for PlainTextParser {
    async fn parse(&self, bytes: &[u8]) -> StageResult<ParsedDocument> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StageError::unrecoverable(format!("document is not valid UTF-8: {e}")))?;

        let sections: Vec<&str> = text.split('\u{c}').collect();
        let pages: Vec<DocumentPage> = sections
            .iter()
            .enumerate()
            .map(|(i, section)| DocumentPage {
                page_number: (i + 1) as u32,
                text: section.trim_matches('\n').to_string(),
                has_tables: looks_tabular(section),
            })
            .collect();

        let title = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(String::from);

        let metadata = DocumentMetadata {
            title,
            page_count: pages.len() as u32,
            creation_date: None,
        };

        let full_text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(ParsedDocument {
            pages,
            metadata,
            full_text,
        })
    }
}

/// Crude table heuristic: several lines containing multiple column
/// separators.
fn looks_tabular(text: &str) -> bool {
    text.lines()
        .filter(|line| line.matches('|').count() >= 2 || line.matches('\t').count() >= 2)
        .count()
        >= 2
}
