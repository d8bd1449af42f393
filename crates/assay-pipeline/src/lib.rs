//! # Assay Pipeline
//!
//! Orchestrates document ingestion: parse, table analysis, entity and
//! relationship extraction, then a parallel fan-out into graph construction
//! and vector storage, joined before visualization and completion.
//!
//! Design points:
//!
//! - **Explicit dependencies.** A run sees exactly the collaborators in its
//!   [`PipelineDeps`] bundle. Nothing is resolved from process-global state.
//! - **Tagged branch results.** The fan-out join matches on
//!   `BranchResult` variants, so fragment identity survives any completion
//!   order.
//! - **Classified failures.** Stages return the shared error taxonomy;
//!   only transient and malformed-output errors are retried, inside a
//!   bounded per-stage budget.
//! - **Status discipline.** Every stage reports its status through the
//!   report store before working, and the store enforces the forward-only
//!   state machine.

pub mod config;
pub mod deps;
mod retry;
pub mod runner;

pub use config::PipelineConfig;
pub use deps::PipelineDeps;
pub use runner::{IngestPipeline, RunHandle};
