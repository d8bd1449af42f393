//! Table summarisation for pages the parser flagged as tabular.

use std::sync::Arc;

use assay_core::{GenerationProvider, StageResult, TableAnalyzer};
use async_trait::async_trait;
use tracing::debug;

const SYSTEM: &str = "You turn financial tables into short prose summaries. State the key \
figures and comparisons the table shows. Do not invent numbers.";

/// Pages longer than this are cut before prompting; tables sit well within
/// this bound and the rest of the page is already in the document text.
const MAX_PAGE_CHARS: usize = 8_000;

/// LLM-backed page summariser. Failures stay page-local by contract; the
/// pipeline logs them and keeps the page's original text.
pub struct TableSummarizer {
    provider: Arc<dyn GenerationProvider>,
}

impl TableSummarizer {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl TableAnalyzer for TableSummarizer {
    async fn analyze_page(&self, page_text: &str, page_number: u32) -> StageResult<Option<String>> {
        let text: String = page_text.chars().take(MAX_PAGE_CHARS).collect();
        let prompt = format!(
            "Summarise the tabular data on this report page in a short paragraph:\n\n{text}"
        );
        let summary = self.provider.generate(&prompt, Some(SYSTEM)).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Ok(None);
        }
        debug!(page = page_number, chars = summary.len(), "table summary produced");
        Ok(Some(format!("[Table summary, page {page_number}] {summary}")))
    }
}
