//! Store and provider abstractions
//!
//! Orchestration crates depend on these traits only; backends implement them.
//! All implementations must be safe to call from concurrent tasks.

mod llm;
mod parser;
mod store;

pub use llm::{EmbeddingProvider, GenerationProvider};
pub use parser::{DocumentParser, TableAnalyzer};
pub use store::{GraphStore, ReportStore, VectorPoint, VectorSearchHit, VectorStore};
