//! Neo4j knowledge-graph backend for Assay.
//!
//! Talks to Neo4j over the transactional HTTP commit endpoint, so the crate
//! carries no driver dependency beyond the HTTP client the rest of the
//! workspace already uses. Three layers:
//!
//! - [`Neo4jClient`]: the `GraphStore` implementation (statements in, row
//!   maps out)
//! - [`GraphWriter`]: MERGE-based upserts of extracted entities and
//!   relationships, idempotent per report
//! - [`VisualizationService`] + [`NodeAggregator`]: fan-out reads merged into
//!   one deduplicated graph snapshot

pub mod aggregate;
pub mod client;
pub mod visualization;
pub mod writer;

pub use aggregate::{AggregatedGraph, GraphNodeInfo, GraphRelationshipInfo, NodeAggregator};
pub use client::{Neo4jClient, Neo4jConfig};
pub use visualization::VisualizationService;
pub use writer::GraphWriter;
