//! # Assay Core
//!
//! Core domain types and trait abstractions for the Assay knowledge-base
//! engine.
//!
//! This crate is the dependency-inversion hub of the workspace: orchestration
//! crates (`assay-pipeline`, `assay-query`) depend only on the traits defined
//! here, while backend crates (`assay-sqlite`, `assay-neo4j`, `assay-qdrant`,
//! `assay-llm`) provide the implementations. No crate in the workspace holds
//! global mutable service state; every store and provider is injected as an
//! `Arc<dyn Trait>`.
//!
//! ## Modules
//!
//! - [`status`]: Report lifecycle state machine
//! - [`report`]: ReportJob record and identifiers
//! - [`document`]: Parsed document model
//! - [`entities`]: Extracted entity and relationship model
//! - [`context`]: Pipeline context and branch result types
//! - [`error`]: Stage error taxonomy
//! - [`traits`]: Store and provider abstractions

pub mod context;
pub mod document;
pub mod entities;
pub mod error;
pub mod report;
pub mod status;
pub mod traits;

pub use context::{BranchOutcome, BranchResult, BranchTag, GraphStats, PipelineContext};
pub use document::{DocumentMetadata, DocumentPage, ParsedDocument};
pub use entities::{
    Company, EntityRef, EntityType, ExtractedEntities, ExtractedRelationship, Industry, Opinion,
    TargetPrice, Theme,
};
pub use error::{StageError, StageResult};
pub use report::{ReportId, ReportJob, UploadOutcome};
pub use status::ReportStatus;
pub use traits::{
    DocumentParser, EmbeddingProvider, GenerationProvider, GraphStore, ReportStore, TableAnalyzer,
    VectorPoint, VectorSearchHit, VectorStore,
};
