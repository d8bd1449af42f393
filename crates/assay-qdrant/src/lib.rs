//! Qdrant vector storage for Assay.
//!
//! [`QdrantClient`] implements the `VectorStore` trait over Qdrant's HTTP
//! API. [`VectorService`] sits above it and owns the chunk-embed-upsert
//! path: deterministic chunking, batch embedding, and report-scoped
//! payloads, with deterministic point ids so re-ingesting a report
//! overwrites its old points instead of duplicating them.

pub mod client;
pub mod service;

pub use client::{QdrantClient, QdrantConfig};
pub use service::{VectorService, DEFAULT_SCORE_THRESHOLD};
