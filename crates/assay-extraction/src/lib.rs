//! LLM-driven extraction of entities and relationships from report text.
//!
//! Two passes over the parsed document: entities first (companies,
//! industries, themes, target prices, rating opinions), then relationships
//! between the entities the first pass found. Both use the structured-output
//! path of the generation provider, which already handles repair and one
//! retry; anything still unparseable surfaces as a malformed-output error
//! and the caller decides whether to re-run the stage.

mod prompts;
mod service;
mod tables;

pub use service::ExtractionService;
pub use tables::TableSummarizer;
