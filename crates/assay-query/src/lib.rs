//! # Assay Query
//!
//! The question-answering workflow over the ingested knowledge base:
//! classify the question's intent, retrieve from the graph and the vector
//! store in parallel, then synthesize a sourced answer.
//!
//! The workflow's contract is that it never fails as a whole. Every
//! collaborator error is recorded in the response's `errors` list and the
//! workflow degrades: retrieval falls back to whichever side worked, and
//! synthesis falls back to a fixed apology when nothing usable came back or
//! the generation provider is down.

pub mod intent;
pub mod retrieve;
pub mod state;
pub mod synthesize;
pub mod workflow;

pub use intent::{IntentClassifier, QueryIntent};
pub use retrieve::{GraphRetriever, HybridRetriever, VectorRetriever};
pub use state::{QueryResponse, QueryState, Source};
pub use synthesize::AnswerSynthesizer;
pub use workflow::{QueryOptions, QueryWorkflow, RetrievalPlan};
