//! Parsed document model
//!
//! Output shape of the document parsing boundary. Parsing itself is a library
//! call behind [`crate::traits::DocumentParser`]; these types are what the
//! pipeline threads through its stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page of a parsed report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    /// 1-based page number.
    pub page_number: u32,
    pub text: String,
    pub has_tables: bool,
}

/// Document-level metadata extracted at parse time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub page_count: u32,
    pub creation_date: Option<DateTime<Utc>>,
}

/// A fully parsed report document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub pages: Vec<DocumentPage>,
    pub metadata: DocumentMetadata,
    pub full_text: String,
}

impl ParsedDocument {
    /// Rebuild `full_text` from the pages, used after table-analysis text
    /// augmentation rewrites page bodies.
    pub fn refresh_full_text(&mut self) {
        self.full_text = self
            .pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
    }

    /// Title falling back to a placeholder for untitled uploads.
    pub fn title_or_default(&self) -> String {
        self.metadata
            .title
            .clone()
            .unwrap_or_else(|| "Untitled Report".to_string())
    }
}
