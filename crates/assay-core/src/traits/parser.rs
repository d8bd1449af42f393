//! Document parsing boundary.

use crate::document::ParsedDocument;
use crate::error::StageResult;
use async_trait::async_trait;

/// Byte-level document parsing is a library call behind this trait.
///
/// Implementations must be deterministic: identical bytes produce an
/// identical `ParsedDocument`, so the upload dedup hash is stable.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, bytes: &[u8]) -> StageResult<ParsedDocument>;
}

/// Optional table-analysis augmentation run between parsing and extraction.
///
/// Given a page that contains tables, returns analysis text to append to the
/// page body (or `None` to leave it untouched). Failures are page-local: the
/// pipeline logs and continues with the unaugmented text.
#[async_trait]
pub trait TableAnalyzer: Send + Sync {
    async fn analyze_page(&self, page_text: &str, page_number: u32) -> StageResult<Option<String>>;
}
